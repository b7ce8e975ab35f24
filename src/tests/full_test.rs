// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use proptest::collection::vec;
use proptest::prelude::*;
use rand::rngs::OsRng;

use crate::client::{ClientLoginFinishParameters, ClientRegistrationFinishParameters};
use crate::config::{Configuration, Group, Hash, Kdf, Mac, Mhf, Mode};
use crate::envelope::Identifiers;
use crate::errors::ProtocolError;
use crate::keypair::KeyPair;
use crate::messages::{Ke1, Ke2, Ke3, RegistrationRequest, RegistrationResponse, RegistrationUpload};
use crate::primitives::Parameters;
use crate::server::{ClientRecord, ServerLoginParameters, ServerSetup};

static STR_PASSWORD: &[u8] = b"correct horse battery staple";
static STR_CREDENTIAL_IDENTIFIER: &[u8] = b"credential_identifier";

fn test_configurations() -> Vec<Configuration> {
    let mut configurations = Vec::new();
    for &oprf_group in &[Group::Ristretto255, Group::P256] {
        for &ake_group in &[Group::Ristretto255, Group::P256] {
            for &mode in &[Mode::Internal, Mode::External] {
                for &(kdf, mac, hash) in &[
                    (Kdf::HkdfSha256, Mac::HmacSha256, Hash::Sha256),
                    (Kdf::HkdfSha512, Mac::HmacSha512, Hash::Sha512),
                ] {
                    configurations.push(Configuration {
                        oprf_group,
                        kdf,
                        mac,
                        hash,
                        mhf: Mhf::Identity,
                        mode,
                        ake_group,
                        nonce_len: 32,
                    });
                }
            }
        }
    }
    configurations
}

struct ProtocolRun {
    record: ClientRecord,
    registration_export_key: Vec<u8>,
    login_export_key: Vec<u8>,
    client_session_key: Vec<u8>,
    server_session_key: Vec<u8>,
    server_info: Vec<u8>,
    registration_request: Vec<u8>,
    registration_response: Vec<u8>,
    registration_upload: Vec<u8>,
    ke1: Vec<u8>,
    ke2: Vec<u8>,
    ke3: Vec<u8>,
}

fn registration_params(
    config: &Configuration,
    external_key: Option<&KeyPair>,
    identifiers: Option<Identifiers>,
) -> ClientRegistrationFinishParameters {
    ClientRegistrationFinishParameters {
        identifiers,
        external_key: match config.mode {
            Mode::Internal => None,
            Mode::External => Some(
                external_key
                    .expect("external mode requires a client keypair")
                    .private()
                    .clone(),
            ),
        },
    }
}

fn run_protocol(
    config: &Configuration,
    setup: &ServerSetup,
    password: &[u8],
    login_password: &[u8],
    identifiers: Option<Identifiers>,
    info: Option<Vec<u8>>,
) -> Result<ProtocolRun, ProtocolError> {
    let mut rng = OsRng;
    let external_kp = KeyPair::generate_random(config.ake_group, &mut rng);

    // Registration
    let mut client = config.client()?;
    let server = config.server()?;
    let request = client.registration_init(&mut rng, password)?;
    let response = server.registration_response(setup, &request, STR_CREDENTIAL_IDENTIFIER)?;
    let registration = client.registration_finalize(
        &mut rng,
        &response,
        &registration_params(config, Some(&external_kp), identifiers.clone()),
    )?;
    let registration_request = request.serialize();
    let registration_response = response.serialize();
    let registration_upload = registration.message.serialize();
    let record = ClientRecord::new(
        STR_CREDENTIAL_IDENTIFIER.to_vec(),
        None,
        registration.message,
    );

    // Login
    let mut client = config.client()?;
    let mut server = config.server()?;
    let ke1 = client.login_init(&mut rng, login_password)?;
    let ke2 = server.login_init(
        &mut rng,
        setup,
        &ke1,
        Some(&record),
        STR_CREDENTIAL_IDENTIFIER,
        &ServerLoginParameters {
            identifiers: identifiers.clone(),
            info,
        },
    )?;
    let login = client.login_finish(
        &ke2,
        &ClientLoginFinishParameters {
            identifiers,
        },
    )?;
    let server_session_key = server.login_finish(&login.message)?;

    assert_eq!(client.session_key(), Some(&login.session_key[..]));
    assert_eq!(server.session_key(), Some(&server_session_key[..]));

    Ok(ProtocolRun {
        record,
        registration_export_key: registration.export_key,
        login_export_key: login.export_key,
        client_session_key: login.session_key,
        server_session_key,
        server_info: login.server_info,
        registration_request,
        registration_response,
        registration_upload,
        ke1: ke1.serialize(),
        ke2: ke2.serialize(),
        ke3: login.message.serialize(),
    })
}

#[test]
fn registration_and_login_agree_across_configurations() {
    let mut rng = OsRng;
    for config in test_configurations() {
        let setup = ServerSetup::new(&config, &mut rng).unwrap();
        let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None)
            .unwrap_or_else(|e| panic!("{} failed: {}", config, e));

        assert_eq!(run.client_session_key, run.server_session_key, "{}", config);
        assert_eq!(run.registration_export_key, run.login_export_key, "{}", config);
        assert!(run.server_info.is_empty());
    }
}

#[test]
fn registration_and_login_agree_with_memory_hard_function() {
    let config = Configuration {
        mhf: Mhf::Argon2id,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();
    assert_eq!(run.client_session_key, run.server_session_key);
    assert_eq!(run.registration_export_key, run.login_export_key);
}

#[test]
fn message_sizes_match_configuration() {
    let mut rng = OsRng;
    for config in test_configurations() {
        let parameters = Parameters::new(&config).unwrap();
        let oprf_len = parameters.oprf_group.element_len();
        let ake_len = parameters.ake_group.element_len();
        let nonce_len = parameters.nonce_len;
        let mac_len = parameters.mac.size();
        let envelope_len = match config.mode {
            Mode::Internal => nonce_len + mac_len,
            Mode::External => nonce_len + parameters.ake_group.scalar_len() + mac_len,
        };
        assert_eq!(parameters.envelope_size(), envelope_len);

        let setup = ServerSetup::new(&config, &mut rng).unwrap();
        let run =
            run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();

        assert_eq!(run.registration_request.len(), oprf_len);
        assert_eq!(run.registration_response.len(), oprf_len + ake_len);
        assert_eq!(
            run.registration_upload.len(),
            ake_len + parameters.kdf.size() + envelope_len
        );
        assert_eq!(run.ke1.len(), oprf_len + nonce_len + ake_len);
        assert_eq!(
            run.ke2.len(),
            oprf_len + nonce_len + (ake_len + envelope_len) + nonce_len + ake_len + 2 + mac_len
        );
        assert_eq!(run.ke3.len(), mac_len);
    }
}

#[test]
fn message_serialization_roundtrips() {
    let mut rng = OsRng;
    for config in test_configurations() {
        let setup = ServerSetup::new(&config, &mut rng).unwrap();
        let run =
            run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();

        let request =
            RegistrationRequest::deserialize(&config, &run.registration_request).unwrap();
        assert_eq!(request.serialize(), run.registration_request);
        let response =
            RegistrationResponse::deserialize(&config, &run.registration_response).unwrap();
        assert_eq!(response.serialize(), run.registration_response);
        let upload = RegistrationUpload::deserialize(&config, &run.registration_upload).unwrap();
        assert_eq!(upload.serialize(), run.registration_upload);
        let ke1 = Ke1::deserialize(&config, &run.ke1).unwrap();
        assert_eq!(ke1.serialize(), run.ke1);
        let ke2 = Ke2::deserialize(&config, &run.ke2).unwrap();
        assert_eq!(ke2.serialize(), run.ke2);
        let ke3 = Ke3::deserialize(&config, &run.ke3).unwrap();
        assert_eq!(ke3.serialize(), run.ke3);
    }
}

#[test]
fn client_record_roundtrips() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();

    let serialized = run.record.serialize().unwrap();
    let deserialized = ClientRecord::deserialize(&config, &serialized).unwrap();
    assert_eq!(deserialized.serialize().unwrap(), serialized);
    assert_eq!(
        deserialized.credential_identifier,
        run.record.credential_identifier
    );
}

#[test]
fn server_setup_roundtrips() {
    let mut rng = OsRng;
    for config in test_configurations() {
        let setup = ServerSetup::new(&config, &mut rng).unwrap();
        let serialized = setup.serialize();
        let deserialized = ServerSetup::deserialize(&config, &serialized).unwrap();
        assert_eq!(deserialized.serialize(), serialized);
        assert_eq!(deserialized.keypair().public(), setup.keypair().public());
    }
}

#[test]
fn wrong_password_fails_login() {
    let mut rng = OsRng;
    for config in test_configurations() {
        let setup = ServerSetup::new(&config, &mut rng).unwrap();
        let result = run_protocol(
            &config,
            &setup,
            STR_PASSWORD,
            b"correct horse battery staplf",
            None,
            None,
        );
        assert_eq!(result.err(), Some(ProtocolError::InvalidCredentials));
    }
}

#[test]
fn identities_agree_and_mismatch_fails() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let ids = Some(Identifiers::ClientAndServerIdentifiers(
        b"alice".to_vec(),
        b"server.example.com".to_vec(),
    ));
    let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, ids, None).unwrap();
    assert_eq!(run.client_session_key, run.server_session_key);

    // Registering under one identity and logging in under another must
    // fail like a wrong password.
    let mut client = config.client().unwrap();
    let server = config.server().unwrap();
    let request = client.registration_init(&mut rng, STR_PASSWORD).unwrap();
    let response = server
        .registration_response(&setup, &request, STR_CREDENTIAL_IDENTIFIER)
        .unwrap();
    let registration = client
        .registration_finalize(
            &mut rng,
            &response,
            &ClientRegistrationFinishParameters {
                identifiers: Some(Identifiers::ClientIdentifier(b"alice".to_vec())),
                external_key: None,
            },
        )
        .unwrap();
    let record = ClientRecord::new(
        STR_CREDENTIAL_IDENTIFIER.to_vec(),
        None,
        registration.message,
    );

    let mut client = config.client().unwrap();
    let mut server = config.server().unwrap();
    let ke1 = client.login_init(&mut rng, STR_PASSWORD).unwrap();
    let ke2 = server
        .login_init(
            &mut rng,
            &setup,
            &ke1,
            Some(&record),
            STR_CREDENTIAL_IDENTIFIER,
            &ServerLoginParameters {
                identifiers: Some(Identifiers::ClientIdentifier(b"mallory".to_vec())),
                info: None,
            },
        )
        .unwrap();
    let result = client.login_finish(
        &ke2,
        &ClientLoginFinishParameters {
            identifiers: Some(Identifiers::ClientIdentifier(b"mallory".to_vec())),
        },
    );
    assert_eq!(result.err(), Some(ProtocolError::InvalidCredentials));
}

#[test]
fn server_info_reaches_authenticated_client() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let info = b"welcome back".to_vec();
    let run = run_protocol(
        &config,
        &setup,
        STR_PASSWORD,
        STR_PASSWORD,
        None,
        Some(info.clone()),
    )
    .unwrap();
    assert_eq!(run.server_info, info);

    // The wire carries the encrypted form, not the plaintext
    let einfo_region = &run.ke2[..run.ke2.len() - Parameters::new(&config).unwrap().mac.size()];
    assert!(!einfo_region
        .windows(info.len())
        .any(|window| window == &info[..]));
}

#[test]
fn unknown_credential_identifier_is_indistinguishable() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();

    // A login for an identifier that was never registered
    let mut client = config.client().unwrap();
    let mut server = config.server().unwrap();
    let ke1 = client.login_init(&mut rng, STR_PASSWORD).unwrap();
    let ke2 = server
        .login_init(
            &mut rng,
            &setup,
            &ke1,
            None,
            b"unregistered user",
            &ServerLoginParameters::default(),
        )
        .unwrap();

    // Well-formed and the same length as a response for a registered user
    let serialized_ke2 = ke2.serialize();
    assert_eq!(serialized_ke2.len(), run.ke2.len());
    assert!(Ke2::deserialize(&config, &serialized_ke2).is_ok());

    // The client cannot authenticate against it
    let result = client.login_finish(&ke2, &ClientLoginFinishParameters::default());
    assert_eq!(result.err(), Some(ProtocolError::InvalidCredentials));

    // Nor can an attacker guess the client MAC
    let mac_len = Parameters::new(&config).unwrap().mac.size();
    let forged = Ke3::deserialize(&config, &vec![0u8; mac_len]).unwrap();
    assert_eq!(
        server.login_finish(&forged).err(),
        Some(ProtocolError::InvalidCredentials)
    );
}

#[test]
fn oprf_evaluations_are_uncorrelated_across_identifiers() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let server = config.server().unwrap();

    let mut client = config.client().unwrap();
    let request = client.registration_init(&mut rng, STR_PASSWORD).unwrap();

    let response_alice = server
        .registration_response(&setup, &request, b"alice")
        .unwrap();
    let response_alice_again = server
        .registration_response(&setup, &request, b"alice")
        .unwrap();
    let response_bob = server
        .registration_response(&setup, &request, b"bob")
        .unwrap();

    assert_eq!(
        response_alice.serialize(),
        response_alice_again.serialize()
    );
    assert_ne!(response_alice.serialize(), response_bob.serialize());
}

#[test]
fn out_of_sequence_operations_fail() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();

    // Finalizing a registration that was never initiated
    let mut client = config.client().unwrap();
    let other_server = config.server().unwrap();
    let mut probe = config.client().unwrap();
    let request = probe.registration_init(&mut rng, STR_PASSWORD).unwrap();
    let response = other_server
        .registration_response(&setup, &request, STR_CREDENTIAL_IDENTIFIER)
        .unwrap();
    assert_eq!(
        client
            .registration_finalize(&mut rng, &response, &Default::default())
            .err(),
        Some(ProtocolError::InvalidState)
    );

    // Finishing a login that was never initiated, on both sides
    let mac_len = Parameters::new(&config).unwrap().mac.size();
    let forged = Ke3::deserialize(&config, &vec![0u8; mac_len]).unwrap();
    let mut server = config.server().unwrap();
    assert_eq!(
        server.login_finish(&forged).err(),
        Some(ProtocolError::InvalidState)
    );
}

#[test]
fn tampered_login_messages_are_rejected() {
    let config = Configuration {
        mhf: Mhf::Identity,
        ..Configuration::default()
    };
    let mut rng = OsRng;
    let setup = ServerSetup::new(&config, &mut rng).unwrap();
    let run = run_protocol(&config, &setup, STR_PASSWORD, STR_PASSWORD, None, None).unwrap();
    let record = run.record;

    // KE1 and KE2 tampering: every affected party must reject before a
    // session key is accepted.
    for position in (0..run.ke1.len()).step_by(3) {
        let mut client = config.client().unwrap();
        let mut server = config.server().unwrap();
        let ke1 = client.login_init(&mut rng, STR_PASSWORD).unwrap();

        let mut tampered = ke1.serialize();
        tampered[position] ^= 1;
        let outcome = Ke1::deserialize(&config, &tampered).and_then(|tampered_ke1| {
            let ke2 = server.login_init(
                &mut rng,
                &setup,
                &tampered_ke1,
                Some(&record),
                STR_CREDENTIAL_IDENTIFIER,
                &ServerLoginParameters::default(),
            )?;
            client.login_finish(&ke2, &ClientLoginFinishParameters::default())?;
            Ok(())
        });
        assert!(outcome.is_err(), "ke1 bit flip at byte {}", position);
    }

    for position in (0..run.ke2.len()).step_by(3) {
        let mut client = config.client().unwrap();
        let mut server = config.server().unwrap();
        let ke1 = client.login_init(&mut rng, STR_PASSWORD).unwrap();
        let ke2 = server
            .login_init(
                &mut rng,
                &setup,
                &ke1,
                Some(&record),
                STR_CREDENTIAL_IDENTIFIER,
                &ServerLoginParameters::default(),
            )
            .unwrap();

        let mut tampered = ke2.serialize();
        tampered[position] ^= 1;
        let outcome = Ke2::deserialize(&config, &tampered).and_then(|tampered_ke2| {
            client.login_finish(&tampered_ke2, &ClientLoginFinishParameters::default())?;
            Ok(())
        });
        assert!(outcome.is_err(), "ke2 bit flip at byte {}", position);
    }

    for position in 0..run.ke3.len() {
        let mut client = config.client().unwrap();
        let mut server = config.server().unwrap();
        let ke1 = client.login_init(&mut rng, STR_PASSWORD).unwrap();
        let ke2 = server
            .login_init(
                &mut rng,
                &setup,
                &ke1,
                Some(&record),
                STR_CREDENTIAL_IDENTIFIER,
                &ServerLoginParameters::default(),
            )
            .unwrap();
        let login = client
            .login_finish(&ke2, &ClientLoginFinishParameters::default())
            .unwrap();

        let mut tampered = login.message.serialize();
        tampered[position] ^= 1;
        let outcome = Ke3::deserialize(&config, &tampered)
            .and_then(|tampered_ke3| server.login_finish(&tampered_ke3));
        assert_eq!(
            outcome.err(),
            Some(ProtocolError::InvalidCredentials),
            "ke3 bit flip at byte {}",
            position
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_crash_registration_request(bytes in vec(any::<u8>(), 0..200)) {
        let config = Configuration::default();
        let _ = RegistrationRequest::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_registration_response(bytes in vec(any::<u8>(), 0..200)) {
        let config = Configuration::default();
        let _ = RegistrationResponse::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_registration_upload(bytes in vec(any::<u8>(), 0..400)) {
        let config = Configuration::default();
        let _ = RegistrationUpload::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_ke1(bytes in vec(any::<u8>(), 0..300)) {
        let config = Configuration::default();
        let _ = Ke1::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_ke2(bytes in vec(any::<u8>(), 0..600)) {
        let config = Configuration::default();
        let _ = Ke2::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_ke3(bytes in vec(any::<u8>(), 0..200)) {
        let config = Configuration::default();
        let _ = Ke3::deserialize(&config, &bytes);
    }

    #[test]
    fn no_crash_configuration(bytes in vec(any::<u8>(), 0..16)) {
        let _ = Configuration::deserialize(&bytes);
    }

    #[test]
    fn no_crash_client_record(bytes in vec(any::<u8>(), 0..600)) {
        let config = Configuration::default();
        let _ = ClientRecord::deserialize(&config, &bytes);
    }
}
