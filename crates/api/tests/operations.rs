// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The begin/update/finish/abort state machine across every algorithm
//! family.

mod common;

use common::*;
use lkms_api::AuthorizationSet;
use lkms_api::BlockMode;
use lkms_api::Digest;
use lkms_api::ErrorCode;
use lkms_api::KeyParam;
use lkms_api::PaddingMode;
use lkms_api::Purpose;
use lkms_api::SoftKeystore;
use lkms_api::Tag;
use lkms_api::MAX_OPERATIONS;

#[test]
fn test_rsa_raw_sign_round_trip() {
    // Raw RSA: the message must be exactly modulus-sized, the signature
    // comes back the same length, and verification round-trips.
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::None, PaddingMode::None))
        .expect("generate failed");

    let message = vec![0x31u8; 64];
    let begin = digest_and_padding(Digest::None, PaddingMode::None);
    let signature = sign_message(&keystore, &bundle.key_blob, &begin, &message)
        .expect("sign failed");
    assert_eq!(signature.len(), 64);
    verify_message(&keystore, &bundle.key_blob, &begin, &message, &signature)
        .expect("verify failed");
}

#[test]
fn test_rsa_raw_sign_short_message_fails_at_finish() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::None, PaddingMode::None))
        .expect("generate failed");

    let begin_params = digest_and_padding(Digest::None, PaddingMode::None);
    let begin = keystore
        .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
        .expect("begin failed");

    let message = vec![0x31u8; 63];
    let update = keystore
        .update(begin.handle, &AuthorizationSet::new(), &message)
        .expect("update failed");
    assert_eq!(update.input_consumed, 63);
    assert!(update.output.is_empty());

    assert_eq!(
        keystore
            .finish(begin.handle, &AuthorizationSet::new(), None)
            .err(),
        Some(ErrorCode::UnknownError)
    );
    // The failed finish destroyed the operation.
    assert_eq!(
        keystore.abort(begin.handle).err(),
        Some(ErrorCode::InvalidOperationHandle)
    );
}

#[test]
fn test_rsa_pss_and_pkcs1_round_trips() {
    let keystore = SoftKeystore::new();
    let message = vec![b'a'; 1024];

    for padding in [PaddingMode::RsaPss, PaddingMode::RsaPkcs1Sign] {
        let bundle = keystore
            .generate_key(&rsa_signing_key(768, 65537, Digest::Sha256, padding))
            .expect("generate failed");
        let begin = digest_and_padding(Digest::Sha256, padding);
        let signature = sign_message(&keystore, &bundle.key_blob, &begin, &message)
            .expect("sign failed");
        assert_eq!(signature.len(), 96);
        verify_message(&keystore, &bundle.key_blob, &begin, &message, &signature)
            .expect("verify failed");

        // Corrupt signature.
        let mut corrupt = signature.clone();
        corrupt[48] ^= 0x04;
        assert_eq!(
            verify_message(&keystore, &bundle.key_blob, &begin, &message, &corrupt).err(),
            Some(ErrorCode::VerificationFailed)
        );

        // Corrupt input.
        let mut other = message.clone();
        other[0] = b'b';
        assert_eq!(
            verify_message(&keystore, &bundle.key_blob, &begin, &other, &signature).err(),
            Some(ErrorCode::VerificationFailed)
        );
    }
}

#[test]
fn test_rsa_pss_key_too_small_for_digest() {
    // PSS needs key bytes >= digest bytes + 10; a 512-bit key cannot
    // carry a SHA-512 PSS signature.
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(
            512,
            65537,
            Digest::Sha512,
            PaddingMode::RsaPss,
        ))
        .expect("generate failed");

    assert_eq!(
        keystore
            .begin(
                Purpose::Sign,
                &bundle.key_blob,
                &digest_and_padding(Digest::Sha512, PaddingMode::RsaPss),
            )
            .err(),
        Some(ErrorCode::IncompatibleDigest)
    );
}

#[test]
fn test_rsa_begin_requires_digest_and_padding() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::Sha256, PaddingMode::RsaPss))
        .expect("generate failed");

    // No digest in begin params.
    let mut begin_params = AuthorizationSet::new();
    begin_params.push(KeyParam::enumerated(Tag::Padding, PaddingMode::RsaPss as u32).unwrap());
    assert_eq!(
        keystore
            .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
            .err(),
        Some(ErrorCode::UnsupportedDigest)
    );

    // No padding in begin params.
    let mut begin_params = AuthorizationSet::new();
    begin_params.push(KeyParam::enumerated(Tag::Digest, Digest::Sha256 as u32).unwrap());
    assert_eq!(
        keystore
            .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
            .err(),
        Some(ErrorCode::UnsupportedPaddingMode)
    );

    // Digest not authorized on the key.
    assert_eq!(
        keystore
            .begin(
                Purpose::Sign,
                &bundle.key_blob,
                &digest_and_padding(Digest::Sha512, PaddingMode::RsaPss),
            )
            .err(),
        Some(ErrorCode::IncompatibleDigest)
    );
}

#[test]
fn test_purpose_mismatches() {
    let keystore = SoftKeystore::new();

    // A signing key cannot encrypt and vice versa.
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::None, PaddingMode::None))
        .expect("generate failed");
    for purpose in [Purpose::Encrypt, Purpose::Decrypt] {
        assert_eq!(
            keystore
                .begin(purpose, &bundle.key_blob, &AuthorizationSet::new())
                .err(),
            Some(ErrorCode::IncompatiblePurpose)
        );
    }

    let bundle = keystore
        .generate_key(&rsa_encryption_key(512, 3, PaddingMode::None))
        .expect("generate failed");
    for purpose in [Purpose::Sign, Purpose::Verify] {
        assert_eq!(
            keystore
                .begin(purpose, &bundle.key_blob, &AuthorizationSet::new())
                .err(),
            Some(ErrorCode::IncompatiblePurpose)
        );
    }

    // EC and HMAC keys cannot encrypt at all, but the key's own purpose
    // list is consulted first.
    let bundle = keystore
        .generate_key(&ec_signing_key(224, Digest::None))
        .expect("generate failed");
    assert_eq!(
        keystore
            .begin(Purpose::Encrypt, &bundle.key_blob, &AuthorizationSet::new())
            .err(),
        Some(ErrorCode::IncompatiblePurpose)
    );

    let bundle = keystore
        .generate_key(&hmac_key(128, Digest::Sha256))
        .expect("generate failed");
    assert_eq!(
        keystore
            .begin(Purpose::Decrypt, &bundle.key_blob, &AuthorizationSet::new())
            .err(),
        Some(ErrorCode::IncompatiblePurpose)
    );
}

#[test]
fn test_rsa_raw_encrypt_round_trip_and_length_rules() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_encryption_key(512, 3, PaddingMode::None))
        .expect("generate failed");

    let begin = {
        let mut params = AuthorizationSet::new();
        params.push(KeyParam::enumerated(Tag::Padding, PaddingMode::None as u32).unwrap());
        params
    };

    // Unpadded RSA is deterministic.
    let message = vec![0x32u8; 64];
    let (_, _, c1) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &message,
        None,
    )
    .expect("encrypt failed");
    let (_, _, c2) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &message,
        None,
    )
    .expect("encrypt failed");
    assert_eq!(c1.len(), 64);
    assert_eq!(c1, c2);

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &c1,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // Too short and too long both fail at finish.
    for bad_len in [63usize, 65] {
        let result = process_message(
            &keystore,
            Purpose::Encrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &vec![0x33u8; bad_len],
            None,
        );
        assert_eq!(result.err(), Some(ErrorCode::InvalidInputLength));
    }
}

#[test]
fn test_rsa_oaep_round_trip_and_corruption() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_encryption_key(512, 3, PaddingMode::RsaOaep))
        .expect("generate failed");

    let begin = {
        let mut params = AuthorizationSet::new();
        params.push(KeyParam::enumerated(Tag::Padding, PaddingMode::RsaOaep as u32).unwrap());
        params
    };

    let message = b"Hello World!";
    let (_, _, c1) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    let (_, _, c2) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    assert_eq!(c1.len(), 64);
    // OAEP is randomized.
    assert_ne!(c1, c2);

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &c1,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // A corrupted ciphertext fails inside the primitive.
    let mut corrupt = c1.clone();
    corrupt[32] = corrupt[32].wrapping_add(1);
    assert_eq!(
        process_message(
            &keystore,
            Purpose::Decrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &corrupt,
            None,
        )
        .err(),
        Some(ErrorCode::UnknownError)
    );

    // Over-long plaintext fails at finish: max is key bytes - 2*20 - 2.
    assert_eq!(
        process_message(
            &keystore,
            Purpose::Encrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &[0u8; 23],
            None,
        )
        .err(),
        Some(ErrorCode::InvalidInputLength)
    );
}

#[test]
fn test_rsa_pkcs1_encrypt_round_trip() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_encryption_key(512, 3, PaddingMode::RsaPkcs1Encrypt))
        .expect("generate failed");

    let begin = {
        let mut params = AuthorizationSet::new();
        params.push(
            KeyParam::enumerated(Tag::Padding, PaddingMode::RsaPkcs1Encrypt as u32).unwrap(),
        );
        params
    };

    let message = b"Hello World!";
    let (_, _, c1) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    let (_, _, c2) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    // PKCS#1 v1.5 is randomized.
    assert_ne!(c1, c2);

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &c1,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // 54 bytes > 64 - 11.
    assert_eq!(
        process_message(
            &keystore,
            Purpose::Encrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &[0u8; 54],
            None,
        )
        .err(),
        Some(ErrorCode::InvalidInputLength)
    );
}

#[test]
fn test_ecdsa_sign_round_trips() {
    let keystore = SoftKeystore::new();
    let message = vec![b'a'; 1024];

    // Raw (digest NONE) on P-224.
    let bundle = keystore
        .generate_key(&ec_signing_key(224, Digest::None))
        .expect("generate failed");
    let mut begin = AuthorizationSet::new();
    begin.push(KeyParam::enumerated(Tag::Digest, Digest::None as u32).unwrap());
    let signature =
        sign_message(&keystore, &bundle.key_blob, &begin, &message).expect("sign failed");
    verify_message(&keystore, &bundle.key_blob, &begin, &message, &signature)
        .expect("verify failed");

    // SHA-256 on P-256.
    let bundle = keystore
        .generate_key(&ec_signing_key(256, Digest::Sha256))
        .expect("generate failed");
    let mut begin = AuthorizationSet::new();
    begin.push(KeyParam::enumerated(Tag::Digest, Digest::Sha256 as u32).unwrap());
    let signature =
        sign_message(&keystore, &bundle.key_blob, &begin, &message).expect("sign failed");
    verify_message(&keystore, &bundle.key_blob, &begin, &message, &signature)
        .expect("verify failed");

    let mut other = message.clone();
    other[0] = b'b';
    assert_eq!(
        verify_message(&keystore, &bundle.key_blob, &begin, &other, &signature).err(),
        Some(ErrorCode::VerificationFailed)
    );
}

#[test]
fn test_hmac_rfc4231_case_2() {
    // S2: key "Jefe", message "what do ya want for nothing?".
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .import_key(&hmac_key(32, Digest::Sha256), lkms_api::KeyFormat::Raw, b"Jefe")
        .expect("import failed");

    let mut begin = AuthorizationSet::new();
    begin.push(KeyParam::uint(Tag::MacLength, 256).unwrap());
    let mac = sign_message(
        &keystore,
        &bundle.key_blob,
        &begin,
        b"what do ya want for nothing?",
    )
    .expect("mac failed");
    assert_eq!(
        hex::encode(&mac),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );

    verify_message(
        &keystore,
        &bundle.key_blob,
        &begin,
        b"what do ya want for nothing?",
        &mac,
    )
    .expect("verify failed");
}

#[test]
fn test_hmac_truncated_mac_and_length_bounds() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&hmac_key(256, Digest::Sha256))
        .expect("generate failed");

    let mut begin = AuthorizationSet::new();
    begin.push(KeyParam::uint(Tag::MacLength, 128).unwrap());
    let mac = sign_message(&keystore, &bundle.key_blob, &begin, b"message").expect("mac failed");
    assert_eq!(mac.len(), 16);
    verify_message(&keystore, &bundle.key_blob, &begin, b"message", &mac)
        .expect("verify failed");

    // Over the digest size, under 64 bits, ragged: all rejected.
    for bad_bits in [264u32, 48, 100] {
        let mut begin = AuthorizationSet::new();
        begin.push(KeyParam::uint(Tag::MacLength, bad_bits).unwrap());
        assert_eq!(
            keystore
                .begin(Purpose::Sign, &bundle.key_blob, &begin)
                .err(),
            Some(ErrorCode::UnsupportedMacLength),
            "mac length {} accepted",
            bad_bits
        );
    }

    // Missing MAC length.
    assert_eq!(
        keystore
            .begin(Purpose::Sign, &bundle.key_blob, &AuthorizationSet::new())
            .err(),
        Some(ErrorCode::UnsupportedMacLength)
    );
}

#[test]
fn test_aes_ecb_round_trip_and_alignment() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Ecb, PaddingMode::None))
        .expect("generate failed");
    let begin = block_mode_and_padding(BlockMode::Ecb, PaddingMode::None);

    let message = b"12345678901234567890123456789012";
    let (_, _, c1) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    assert_eq!(c1.len(), message.len());
    let (_, _, c2) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    // ECB is deterministic.
    assert_eq!(c1, c2);

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &c1,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // Ragged input without padding fails at finish.
    let begin_result = keystore
        .begin(Purpose::Encrypt, &bundle.key_blob, &begin)
        .expect("begin failed");
    let update = keystore
        .update(begin_result.handle, &AuthorizationSet::new(), &message[..31])
        .expect("update failed");
    assert_eq!(update.input_consumed, 31);
    assert_eq!(
        keystore
            .finish(begin_result.handle, &AuthorizationSet::new(), None)
            .err(),
        Some(ErrorCode::InvalidInputLength)
    );
}

#[test]
fn test_aes_ecb_pkcs7_round_trip_and_corrupt_padding() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Ecb, PaddingMode::Pkcs7))
        .expect("generate failed");
    let begin = block_mode_and_padding(BlockMode::Ecb, PaddingMode::Pkcs7);

    let message = b"a";
    let (_, _, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    assert_eq!(ciphertext.len(), 16);

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    let mut corrupt = ciphertext.clone();
    corrupt[8] = corrupt[8].wrapping_add(1);
    assert_eq!(
        process_message(
            &keystore,
            Purpose::Decrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &corrupt,
            None,
        )
        .err(),
        Some(ErrorCode::InvalidArgument)
    );
}

#[test]
fn test_aes_cbc_round_trip_with_generated_iv() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Cbc, PaddingMode::None))
        .expect("generate failed");
    let begin = block_mode_and_padding(BlockMode::Cbc, PaddingMode::None);

    let message = b"12345678901234567890123456789012";
    let (begin_out, _, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");

    let iv = begin_out.get_bytes(Tag::Nonce).expect("no IV returned");
    assert_eq!(iv.len(), 16);

    let mut decrypt_begin = begin.clone();
    decrypt_begin.push(KeyParam::bytes(Tag::Nonce, iv.to_vec()).unwrap());
    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &decrypt_begin,
        &AuthorizationSet::new(),
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // Decrypting under a different IV yields different plaintext.
    let mut wrong_begin = begin.clone();
    wrong_begin.push(KeyParam::bytes(Tag::Nonce, vec![b'a'; 16]).unwrap());
    let (_, _, garbled) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &wrong_begin,
        &AuthorizationSet::new(),
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_ne!(garbled, message);
}

#[test]
fn test_aes_cbc_incremental_streaming() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Cbc, PaddingMode::None))
        .expect("generate failed");
    let begin_params = block_mode_and_padding(BlockMode::Cbc, PaddingMode::None);

    let message = vec![b'a'; 240];
    let begin = keystore
        .begin(Purpose::Encrypt, &bundle.key_blob, &begin_params)
        .expect("begin failed");
    let iv = begin
        .out_params
        .get_bytes(Tag::Nonce)
        .expect("no IV")
        .to_vec();

    let mut ciphertext = Vec::new();
    for chunk in message.chunks(15) {
        let update = keystore
            .update(begin.handle, &AuthorizationSet::new(), chunk)
            .expect("update failed");
        assert_eq!(update.input_consumed, chunk.len());
        ciphertext.extend_from_slice(&update.output);
    }
    let finish = keystore
        .finish(begin.handle, &AuthorizationSet::new(), None)
        .expect("finish failed");
    ciphertext.extend_from_slice(&finish.output);
    assert_eq!(ciphertext.len(), message.len());

    // Decrypt in different increments.
    let mut decrypt_begin = begin_params.clone();
    decrypt_begin.push(KeyParam::bytes(Tag::Nonce, iv).unwrap());
    let begin = keystore
        .begin(Purpose::Decrypt, &bundle.key_blob, &decrypt_begin)
        .expect("begin failed");
    let mut plaintext = Vec::new();
    for chunk in ciphertext.chunks(23) {
        let update = keystore
            .update(begin.handle, &AuthorizationSet::new(), chunk)
            .expect("update failed");
        plaintext.extend_from_slice(&update.output);
    }
    let finish = keystore
        .finish(begin.handle, &AuthorizationSet::new(), None)
        .expect("finish failed");
    plaintext.extend_from_slice(&finish.output);
    assert_eq!(plaintext, message);
}

#[test]
fn test_aes_caller_nonce_rules() {
    let keystore = SoftKeystore::new();

    // Key without the caller-nonce authorization.
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Cbc, PaddingMode::None))
        .expect("generate failed");
    let mut begin = block_mode_and_padding(BlockMode::Cbc, PaddingMode::None);
    begin.push(KeyParam::bytes(Tag::Nonce, b"abcdefghijklmnop".to_vec()).unwrap());
    assert_eq!(
        keystore
            .begin(Purpose::Encrypt, &bundle.key_blob, &begin)
            .err(),
        Some(ErrorCode::CallerNonceProhibited)
    );

    // Key with it: caller nonce accepted, round-trips.
    let mut params = aes_encryption_key(128, BlockMode::Cbc, PaddingMode::None);
    params.push(KeyParam::boolean(Tag::CallerNonce).unwrap());
    let bundle = keystore.generate_key(&params).expect("generate failed");

    let message = b"12345678901234567890123456789012";
    let (begin_out, _, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    // The caller supplied the nonce, so none is returned.
    assert!(begin_out.get_bytes(Tag::Nonce).is_none());

    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &begin,
        &AuthorizationSet::new(),
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // A wrong-length caller nonce is invalid.
    let mut bad = block_mode_and_padding(BlockMode::Cbc, PaddingMode::None);
    bad.push(KeyParam::bytes(Tag::Nonce, b"123".to_vec()).unwrap());
    assert_eq!(
        keystore
            .begin(Purpose::Encrypt, &bundle.key_blob, &bad)
            .err(),
        Some(ErrorCode::InvalidNonce)
    );
}

#[test]
fn test_aes_ctr_nist_vectors() {
    // S3: NIST SP 800-38A section F.5, all three key sizes.
    struct Vector {
        key: &'static str,
        plaintext: &'static str,
        ciphertext: &'static str,
    }
    let nonce = "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff";
    let plaintext = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
                     30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710";
    let vectors = [
        Vector {
            key: "2b7e151628aed2a6abf7158809cf4f3c",
            plaintext,
            ciphertext: "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff\
                         5ae4df3edbd5d35e5b4f09020db03eab1e031dda2fbe03d1792170a0f3009cee",
        },
        Vector {
            key: "8e73b0f7da0e6452c810f32b809079e562f8ead2522c6b7b",
            plaintext,
            ciphertext: "1abc932417521ca24f2b0459fe7e6e0b090339ec0aa6faefd5ccc2c6f4ce8e94\
                         1e36b26bd1ebc670d1bd1d665620abf74f78a7f6d29809585a97daec58c6b050",
        },
        Vector {
            key: "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
            plaintext,
            ciphertext: "601ec313775789a5b7a7f504bbf3d228f443e3ca4d62b59aca84e990cacaf5c5\
                         2b0930daa23de94ce87017ba2d84988ddfc9c58db67aada613c2dd08457941a6",
        },
    ];

    let keystore = SoftKeystore::new();
    for vector in &vectors {
        let key = hex::decode(vector.key).unwrap();
        let mut params =
            aes_encryption_key((key.len() * 8) as u32, BlockMode::Ctr, PaddingMode::None);
        params.push(KeyParam::boolean(Tag::CallerNonce).unwrap());
        let bundle = keystore
            .import_key(&params, lkms_api::KeyFormat::Raw, &key)
            .expect("import failed");

        let mut begin = block_mode_and_padding(BlockMode::Ctr, PaddingMode::None);
        begin.push(KeyParam::bytes(Tag::Nonce, hex::decode(nonce).unwrap()).unwrap());

        let (_, _, ciphertext) = process_message(
            &keystore,
            Purpose::Encrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &hex::decode(vector.plaintext).unwrap(),
            None,
        )
        .expect("encrypt failed");
        assert_eq!(hex::encode(&ciphertext), vector.ciphertext.replace(' ', ""));

        let (_, _, decrypted) = process_message(
            &keystore,
            Purpose::Decrypt,
            &bundle.key_blob,
            &begin,
            &AuthorizationSet::new(),
            &ciphertext,
            None,
        )
        .expect("decrypt failed");
        assert_eq!(hex::encode(&decrypted), vector.plaintext.replace(' ', ""));
    }
}

#[test]
fn test_aes_ctr_rejects_padding() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Ctr, PaddingMode::Pkcs7))
        .expect("generate failed");

    // NONE is structurally fine for CTR but not authorized on this key.
    assert_eq!(
        keystore
            .begin(
                Purpose::Encrypt,
                &bundle.key_blob,
                &block_mode_and_padding(BlockMode::Ctr, PaddingMode::None),
            )
            .err(),
        Some(ErrorCode::IncompatiblePaddingMode)
    );

    // PKCS#7 is meaningless for a stream mode.
    assert_eq!(
        keystore
            .begin(
                Purpose::Encrypt,
                &bundle.key_blob,
                &block_mode_and_padding(BlockMode::Ctr, PaddingMode::Pkcs7),
            )
            .err(),
        Some(ErrorCode::UnsupportedPaddingMode)
    );
}

fn gcm_begin_params(mac_bits: u32) -> AuthorizationSet {
    let mut params = block_mode_and_padding(BlockMode::Gcm, PaddingMode::None);
    params.push(KeyParam::uint(Tag::MacLength, mac_bits).unwrap());
    params
}

fn aad_params(aad: &[u8]) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::bytes(Tag::AssociatedData, aad.to_vec()).unwrap());
    params
}

#[test]
fn test_aes_gcm_round_trip_and_aad_tamper() {
    // S4: encrypt with AAD "foobar"; decrypting with AAD "barfoo" fails
    // verification, with the right AAD the plaintext comes back.
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Gcm, PaddingMode::None))
        .expect("generate failed");

    let message = b"123456789012345678901234567890123456";
    let (begin_out, finish_out, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &gcm_begin_params(128),
        &aad_params(b"foobar"),
        message,
        None,
    )
    .expect("encrypt failed");

    let nonce = begin_out.get_bytes(Tag::Nonce).expect("no nonce").to_vec();
    assert_eq!(nonce.len(), 12);
    let tag = finish_out.get_bytes(Tag::AeadTag).expect("no tag").to_vec();
    assert_eq!(tag.len(), 16);

    let mut decrypt_begin = gcm_begin_params(128);
    decrypt_begin.push(KeyParam::bytes(Tag::Nonce, nonce.clone()).unwrap());
    let mut update_params = aad_params(b"barfoo");
    update_params.push(KeyParam::bytes(Tag::AeadTag, tag.clone()).unwrap());
    assert_eq!(
        process_message(
            &keystore,
            Purpose::Decrypt,
            &bundle.key_blob,
            &decrypt_begin,
            &update_params,
            &ciphertext,
            None,
        )
        .err(),
        Some(ErrorCode::VerificationFailed)
    );

    let mut update_params = aad_params(b"foobar");
    update_params.push(KeyParam::bytes(Tag::AeadTag, tag.clone()).unwrap());
    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &decrypt_begin,
        &update_params,
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);
}

#[test]
fn test_aes_gcm_corruption_matrix() {
    // Corrupting ciphertext, AAD, tag or nonce must each fail
    // verification.
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Gcm, PaddingMode::None))
        .expect("generate failed");

    let message = b"123456789012345678901234567890123456";
    let aad = b"header";
    let (begin_out, finish_out, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &gcm_begin_params(128),
        &aad_params(aad),
        message,
        None,
    )
    .expect("encrypt failed");
    let nonce = begin_out.get_bytes(Tag::Nonce).unwrap().to_vec();
    let tag = finish_out.get_bytes(Tag::AeadTag).unwrap().to_vec();

    let decrypt = |nonce: &[u8], aad: &[u8], tag: &[u8], ciphertext: &[u8]| {
        let mut begin = gcm_begin_params(128);
        begin.push(KeyParam::bytes(Tag::Nonce, nonce.to_vec()).unwrap());
        let mut update = aad_params(aad);
        update.push(KeyParam::bytes(Tag::AeadTag, tag.to_vec()).unwrap());
        process_message(
            &keystore,
            Purpose::Decrypt,
            &bundle.key_blob,
            &begin,
            &update,
            ciphertext,
            None,
        )
        .map(|(_, _, plaintext)| plaintext)
    };

    assert_eq!(decrypt(&nonce, aad, &tag, &ciphertext).unwrap(), message);

    let mut bad = ciphertext.clone();
    bad[17] ^= 0x20;
    assert_eq!(
        decrypt(&nonce, aad, &tag, &bad).err(),
        Some(ErrorCode::VerificationFailed)
    );

    assert_eq!(
        decrypt(&nonce, b"hexder", &tag, &ciphertext).err(),
        Some(ErrorCode::VerificationFailed)
    );

    let mut bad = tag.clone();
    bad[15] ^= 0x80;
    assert_eq!(
        decrypt(&nonce, aad, &bad, &ciphertext).err(),
        Some(ErrorCode::VerificationFailed)
    );

    let mut bad = nonce.clone();
    bad[0] ^= 0x01;
    assert_eq!(
        decrypt(&bad, aad, &tag, &ciphertext).err(),
        Some(ErrorCode::VerificationFailed)
    );
}

#[test]
fn test_aes_gcm_multi_part_aad_and_streaming() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Gcm, PaddingMode::None))
        .expect("generate failed");

    let message = b"123456789012345678901234567890123456";

    // AAD split across two updates before any cipher input.
    let begin = keystore
        .begin(Purpose::Encrypt, &bundle.key_blob, &gcm_begin_params(128))
        .expect("begin failed");
    keystore
        .update(begin.handle, &aad_params(b"foo"), &[])
        .expect("aad update failed");
    let update = keystore
        .update(begin.handle, &aad_params(b"bar"), message)
        .expect("update failed");
    let mut ciphertext = update.output;
    let finish = keystore
        .finish(begin.handle, &AuthorizationSet::new(), None)
        .expect("finish failed");
    ciphertext.extend_from_slice(&finish.output);

    let nonce = begin.out_params.get_bytes(Tag::Nonce).unwrap().to_vec();
    let tag = finish.out_params.get_bytes(Tag::AeadTag).unwrap().to_vec();

    // Decrypt with the concatenated AAD in one piece.
    let mut decrypt_begin = gcm_begin_params(128);
    decrypt_begin.push(KeyParam::bytes(Tag::Nonce, nonce).unwrap());
    let mut update_params = aad_params(b"foobar");
    update_params.push(KeyParam::bytes(Tag::AeadTag, tag).unwrap());
    let (_, _, plaintext) = process_message(
        &keystore,
        Purpose::Decrypt,
        &bundle.key_blob,
        &decrypt_begin,
        &update_params,
        &ciphertext,
        None,
    )
    .expect("decrypt failed");
    assert_eq!(plaintext, message);

    // AAD after cipher data is rejected and destroys the operation.
    let begin = keystore
        .begin(Purpose::Encrypt, &bundle.key_blob, &gcm_begin_params(128))
        .expect("begin failed");
    keystore
        .update(begin.handle, &AuthorizationSet::new(), message)
        .expect("update failed");
    assert_eq!(
        keystore
            .update(begin.handle, &aad_params(b"late"), &[])
            .err(),
        Some(ErrorCode::InvalidArgument)
    );
    assert_eq!(
        keystore.abort(begin.handle).err(),
        Some(ErrorCode::InvalidOperationHandle)
    );
}

#[test]
fn test_aes_gcm_short_tag_rejected_at_update() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Gcm, PaddingMode::None))
        .expect("generate failed");

    let message = b"123456789012345678901234567890123456";
    let (begin_out, finish_out, ciphertext) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &gcm_begin_params(128),
        &AuthorizationSet::new(),
        message,
        None,
    )
    .expect("encrypt failed");
    let nonce = begin_out.get_bytes(Tag::Nonce).unwrap().to_vec();
    let tag = finish_out.get_bytes(Tag::AeadTag).unwrap().to_vec();

    let mut decrypt_begin = gcm_begin_params(128);
    decrypt_begin.push(KeyParam::bytes(Tag::Nonce, nonce).unwrap());
    let begin = keystore
        .begin(Purpose::Decrypt, &bundle.key_blob, &decrypt_begin)
        .expect("begin failed");

    let mut update_params = AuthorizationSet::new();
    update_params.push(KeyParam::bytes(Tag::AeadTag, tag[..11].to_vec()).unwrap());
    assert_eq!(
        keystore
            .update(begin.handle, &update_params, &ciphertext)
            .err(),
        Some(ErrorCode::UnsupportedMacLength)
    );
}

#[test]
fn test_aes_gcm_requires_mac_length() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&aes_encryption_key(128, BlockMode::Gcm, PaddingMode::None))
        .expect("generate failed");

    assert_eq!(
        keystore
            .begin(
                Purpose::Encrypt,
                &bundle.key_blob,
                &block_mode_and_padding(BlockMode::Gcm, PaddingMode::None),
            )
            .err(),
        Some(ErrorCode::UnsupportedMacLength)
    );

    for bad_bits in [88u32, 136, 100] {
        assert_eq!(
            keystore
                .begin(Purpose::Encrypt, &bundle.key_blob, &gcm_begin_params(bad_bits))
                .err(),
            Some(ErrorCode::UnsupportedMacLength),
            "mac length {} accepted",
            bad_bits
        );
    }
}

#[test]
fn test_begin_abort_abort() {
    // S6: the second abort sees no operation.
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::None, PaddingMode::None))
        .expect("generate failed");

    let begin = keystore
        .begin(
            Purpose::Sign,
            &bundle.key_blob,
            &digest_and_padding(Digest::None, PaddingMode::None),
        )
        .expect("begin failed");
    keystore.abort(begin.handle).expect("first abort failed");
    assert_eq!(
        keystore.abort(begin.handle).err(),
        Some(ErrorCode::InvalidOperationHandle)
    );
}

#[test]
fn test_operation_table_capacity() {
    let keystore = SoftKeystore::new();
    let bundle = keystore
        .generate_key(&rsa_signing_key(512, 3, Digest::None, PaddingMode::None))
        .expect("generate failed");
    let begin_params = digest_and_padding(Digest::None, PaddingMode::None);

    let mut handles = Vec::new();
    for _ in 0..MAX_OPERATIONS {
        handles.push(
            keystore
                .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
                .expect("begin failed")
                .handle,
        );
    }
    assert_eq!(
        keystore
            .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
            .err(),
        Some(ErrorCode::TooManyOperations)
    );

    keystore.abort(handles[0]).expect("abort failed");
    let replacement = keystore
        .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
        .expect("begin after abort failed");
    assert!(!handles.contains(&replacement.handle));

    for handle in handles.into_iter().skip(1) {
        keystore.abort(handle).expect("abort failed");
    }
    keystore.abort(replacement.handle).expect("abort failed");
}

#[test]
fn test_stale_handles_are_rejected() {
    let keystore = SoftKeystore::new();
    assert_eq!(
        keystore
            .update(12345, &AuthorizationSet::new(), b"data")
            .err(),
        Some(ErrorCode::InvalidOperationHandle)
    );
    assert_eq!(
        keystore.finish(12345, &AuthorizationSet::new(), None).err(),
        Some(ErrorCode::InvalidOperationHandle)
    );

    // A finished operation's handle is gone, success or not.
    let bundle = keystore
        .generate_key(&hmac_key(256, Digest::Sha256))
        .expect("generate failed");
    let mut begin_params = AuthorizationSet::new();
    begin_params.push(KeyParam::uint(Tag::MacLength, 256).unwrap());
    let begin = keystore
        .begin(Purpose::Sign, &bundle.key_blob, &begin_params)
        .expect("begin failed");
    keystore
        .update(begin.handle, &AuthorizationSet::new(), b"payload")
        .expect("update failed");
    keystore
        .finish(begin.handle, &AuthorizationSet::new(), None)
        .expect("finish failed");
    assert_eq!(
        keystore.finish(begin.handle, &AuthorizationSet::new(), None).err(),
        Some(ErrorCode::InvalidOperationHandle)
    );
}

#[test]
fn test_parallel_operations_are_independent() {
    use std::sync::Arc;

    let keystore = Arc::new(SoftKeystore::new());
    let bundle = Arc::new(
        keystore
            .generate_key(&hmac_key(256, Digest::Sha256))
            .expect("generate failed"),
    );

    let mut begin_params = AuthorizationSet::new();
    begin_params.push(KeyParam::uint(Tag::MacLength, 256).unwrap());
    let reference = sign_message(&keystore, &bundle.key_blob, &begin_params, b"payload")
        .expect("mac failed");

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let keystore = Arc::clone(&keystore);
            let bundle = Arc::clone(&bundle);
            let reference = reference.clone();
            std::thread::spawn(move || {
                let mut begin_params = AuthorizationSet::new();
                begin_params.push(KeyParam::uint(Tag::MacLength, 256).unwrap());
                for _ in 0..20 {
                    let mac =
                        sign_message(&keystore, &bundle.key_blob, &begin_params, b"payload")
                            .expect("mac failed");
                    assert_eq!(mac, reference);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }
}

#[test]
fn test_streamed_output_matches_one_shot() {
    // CTR output concatenated across updates equals the single-update
    // output for the same nonce.
    let keystore = SoftKeystore::new();
    let mut params = aes_encryption_key(128, BlockMode::Ctr, PaddingMode::None);
    params.push(KeyParam::boolean(Tag::CallerNonce).unwrap());
    let bundle = keystore.generate_key(&params).expect("generate failed");

    let mut begin_params = block_mode_and_padding(BlockMode::Ctr, PaddingMode::None);
    begin_params.push(KeyParam::bytes(Tag::Nonce, vec![7u8; 16]).unwrap());
    let message = vec![0xa5u8; 239];

    let (_, _, one_shot) = process_message(
        &keystore,
        Purpose::Encrypt,
        &bundle.key_blob,
        &begin_params,
        &AuthorizationSet::new(),
        &message,
        None,
    )
    .expect("encrypt failed");

    let begin = keystore
        .begin(Purpose::Encrypt, &bundle.key_blob, &begin_params)
        .expect("begin failed");
    let mut streamed = Vec::new();
    for chunk in message.chunks(15) {
        let update = keystore
            .update(begin.handle, &AuthorizationSet::new(), chunk)
            .expect("update failed");
        streamed.extend_from_slice(&update.output);
    }
    let finish = keystore
        .finish(begin.handle, &AuthorizationSet::new(), None)
        .expect("finish failed");
    streamed.extend_from_slice(&finish.output);

    assert_eq!(streamed, one_shot);
}
