use std::sync::Arc;

use blowfast::{zero_pad, Cbc, Codec, Ctr, Ecb, Error};

static DEFAULT_KEY: &str = "a3bd614b27864e3f854b971f9df1a802";

// Eric Young's published ECB vectors: (key, plain, cipher).
static ECB_VECTORS: [(&str, &str, &str); 7] = [
    ("0000000000000000", "0000000000000000", "4EF997456198DD78"),
    ("FFFFFFFFFFFFFFFF", "FFFFFFFFFFFFFFFF", "51866FD5B85ECB8A"),
    ("3000000000000000", "1000000000000001", "7D856F9A613063F2"),
    ("1111111111111111", "1111111111111111", "2466DD878B963C9D"),
    ("0123456789ABCDEF", "1111111111111111", "61F9C3802281B096"),
    ("FEDCBA9876543210", "0123456789ABCDEF", "0ACEAB0FC6A0A28D"),
    ("7CA110454A1A6E57", "01A1D6D039776742", "59C68245EB05282B"),
];

static CBC_KEY: &str = "0123456789ABCDEFF0E1D2C3B4A59687";
static CBC_IV: &str = "FEDCBA9876543210";
// "7654321 Now is the time for " plus the trailing NUL, 29 bytes.
static CBC_PLAIN: &str = "37363534333231204E6F77206973207468652074696D6520666F722000";
static CBC_CIPHER: &str = "6B77B4D63006DEE605B156E27403979358DEB9E7154616D959F1652BD5FF92CC";

static CTR_IV: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
static CTR_CIPHER_37_COUNTER_0: &str =
    "328B59DA265C4E7469A7B3002D5FAB815E74C05AF5F3F4C1F4E3B3BDD9D233E4D4BC85AF33";
static CTR_CIPHER_37_COUNTER_5: &str =
    "907B098608E3EAD3CC98FFE8DFC1B2476B911A6225E9C4EF07837CDA731D3DA7A15612E9A1";
static CTR_CIPHER_16_COUNTER_MINUS_1: &str = "68A317EF76FC8D263A8351D22E54467C";

static ECB_CIPHER_24: &str = "4087320BFEB6CF51EB1792000483609A7A2E88E3E907ED26";

fn payload(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 256) as u8).collect()
}

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn encrypt_block_known_vectors() {
    for (key, plain, cipher) in ECB_VECTORS {
        let codec = Codec::from_hex(key).unwrap();
        let mut block = unhex(plain);
        codec.encrypt_block(&mut block);
        assert_eq!(block, unhex(cipher), "key {key}");
    }
}

#[test]
fn decrypt_block_known_vectors() {
    for (key, plain, cipher) in ECB_VECTORS {
        let codec = Codec::from_hex(key).unwrap();
        let mut block = unhex(cipher);
        codec.decrypt_block(&mut block);
        assert_eq!(block, unhex(plain), "key {key}");
    }
}

#[test]
fn encrypt_block_only_touches_first_eight_bytes() {
    let codec = Codec::from_hex(ECB_VECTORS[0].0).unwrap();
    let mut data = [0u8; 12];
    data[8..].copy_from_slice(&[1, 2, 3, 4]);
    codec.encrypt_block(&mut data);
    assert_eq!(&data[..8], unhex(ECB_VECTORS[0].2).as_slice());
    assert_eq!(&data[8..], &[1, 2, 3, 4]);
}

#[test]
fn encipher_decipher_are_inverse() {
    let codec = Codec::from_hex(DEFAULT_KEY).unwrap();
    for (xl, xr) in [(0, 0), (u32::MAX, u32::MAX), (0xdead_beef, 0x0123_4567), (1, 0x8000_0000)] {
        let (cl, cr) = codec.encipher(xl, xr);
        assert_ne!((cl, cr), (xl, xr));
        assert_eq!(codec.decipher(cl, cr), (xl, xr));
    }
}

#[test]
fn key_length_boundaries() {
    assert!(matches!(Codec::new(&[0u8; 7]), Err(Error::InvalidKeyLength(7))));
    assert!(matches!(Codec::new(&[0u8; 449]), Err(Error::InvalidKeyLength(449))));
    assert!(matches!(Codec::new(&[]), Err(Error::InvalidKeyLength(0))));
    assert!(Codec::new(&[0u8; 8]).is_ok());
    assert!(Codec::new(&[0u8; 448]).is_ok());
}

#[test]
fn keys_longer_than_seventy_two_bytes_use_only_the_prefix() {
    let long: Vec<u8> = payload(448);
    let a = Codec::new(&long).unwrap();
    let b = Codec::new(&long[..72]).unwrap();
    let mut x = [0u8; 8];
    let mut y = [0u8; 8];
    a.encrypt_block(&mut x);
    b.encrypt_block(&mut y);
    assert_eq!(x, y);
    assert_eq!(x.to_vec(), unhex("ED131748F2BC8932"));
}

#[test]
fn hex_keys_are_case_insensitive() {
    let upper = Codec::from_hex("A3BD614B27864E3F854B971F9DF1A802").unwrap();
    let lower = Codec::from_hex(DEFAULT_KEY).unwrap();
    let mut a = payload(8);
    let mut b = payload(8);
    upper.encrypt_block(&mut a);
    lower.encrypt_block(&mut b);
    assert_eq!(a, b);
}

#[test]
fn invalid_hex_key_is_rejected() {
    assert!(matches!(Codec::from_hex("0123456789abcdeg"), Err(Error::InvalidHex(_))));
    assert!(matches!(Codec::from_hex("0123456789abcde"), Err(Error::InvalidHex(_))));
    assert!(matches!(Codec::from_hex("00112233445566"), Err(Error::InvalidKeyLength(7))));
}

#[test]
fn debug_does_not_leak_key_schedule() {
    let codec = Codec::from_hex(DEFAULT_KEY).unwrap();
    assert_eq!(format!("{codec:?}"), "Codec { .. }");
}

#[test]
fn encrypt_ecb_known_payload() {
    let sut = Ecb::from_hex(DEFAULT_KEY).unwrap();
    let mut data = payload(24);
    assert!(sut.encrypt(&mut data));
    assert_eq!(data, unhex(ECB_CIPHER_24));
    assert!(sut.decrypt(&mut data));
    assert_eq!(data, payload(24));
}

#[test]
fn ecb_batched_and_single_block_paths_agree() {
    let codec = Arc::new(Codec::from_hex(DEFAULT_KEY).unwrap());
    let sut = Ecb::new(codec.clone());
    // 16 blocks per batch plus a tail of 3 single blocks.
    let mut data = payload(19 * 8);
    let mut expected = data.clone();
    expected.chunks_exact_mut(8).for_each(|b| codec.encrypt_block(b));
    assert!(sut.encrypt(&mut data));
    assert_eq!(data, expected);
}

#[test]
fn ecb_rejects_non_padded_payload() {
    let sut = Ecb::from_hex(DEFAULT_KEY).unwrap();
    let mut buf = payload(17);
    assert!(!sut.encrypt(&mut buf));
    assert!(!sut.decrypt(&mut buf));
    assert_eq!(buf, payload(17));
    assert!(!sut.encrypt(&mut []));
}

#[test]
fn cbc_schneier_vector() {
    let sut = Cbc::from_hex(CBC_KEY).unwrap();
    let iv = unhex(CBC_IV);
    let mut data = zero_pad(&unhex(CBC_PLAIN));
    assert_eq!(data.len(), 32);

    assert!(sut.encrypt(&mut data, &iv));
    assert_eq!(data, unhex(CBC_CIPHER));

    assert!(sut.decrypt(&mut data, &iv));
    assert_eq!(data, zero_pad(&unhex(CBC_PLAIN)));
}

#[test]
fn cbc_rejects_non_padded_payload_and_bad_iv() {
    let sut = Cbc::from_hex(DEFAULT_KEY).unwrap();
    let mut buf = payload(17);
    assert!(!sut.encrypt(&mut buf, &CTR_IV));
    assert!(!sut.decrypt(&mut buf, &CTR_IV));
    assert_eq!(buf, payload(17));

    let mut buf = payload(16);
    assert!(!sut.encrypt(&mut buf, &CTR_IV[..7]));
    assert!(!sut.encrypt(&mut buf, &[0u8; 9]));
    assert!(!sut.decrypt(&mut buf, &[]));
    assert_eq!(buf, payload(16));
}

#[test]
fn cbc_encrypt_and_decrypt() {
    let sut = Cbc::from_hex(DEFAULT_KEY).unwrap();
    let mut buf = payload(32);
    assert!(sut.encrypt(&mut buf, &CTR_IV));
    assert_ne!(buf, payload(32));
    // Identical plaintext blocks must not produce identical ciphertext blocks.
    let mut same = vec![7u8; 16];
    assert!(sut.encrypt(&mut same, &CTR_IV));
    assert_ne!(same[..8], same[8..]);

    assert!(sut.decrypt(&mut buf, &CTR_IV));
    assert_eq!(buf, payload(32));
}

#[test]
fn ctr_known_vectors() {
    let sut = Ctr::from_hex(DEFAULT_KEY).unwrap();

    let mut buf = payload(37);
    assert!(sut.crypt_or_decrypt(&mut buf, &CTR_IV, 0));
    assert_eq!(buf, unhex(CTR_CIPHER_37_COUNTER_0));

    let mut buf = payload(37);
    assert!(sut.crypt_or_decrypt(&mut buf, &CTR_IV, 5));
    assert_eq!(buf, unhex(CTR_CIPHER_37_COUNTER_5));

    let mut buf = payload(16);
    assert!(sut.crypt_or_decrypt(&mut buf, &CTR_IV, -1));
    assert_eq!(buf, unhex(CTR_CIPHER_16_COUNTER_MINUS_1));
}

#[test]
fn ctr_encrypt_and_decrypt_unpadded() {
    let sut = Ctr::from_hex(DEFAULT_KEY).unwrap();
    let mut buf = payload(37);
    assert!(sut.crypt_or_decrypt(&mut buf, &CTR_IV, 0));
    assert!(sut.crypt_or_decrypt(&mut buf, &CTR_IV, 0));
    assert_eq!(buf, payload(37));
}

#[test]
fn ctr_counter_continues_across_calls() {
    let sut = Ctr::from_hex(DEFAULT_KEY).unwrap();
    let mut whole = payload(64);
    assert!(sut.crypt_or_decrypt(&mut whole, &CTR_IV, 0));

    let mut split = payload(64);
    let (head, tail) = split.split_at_mut(24);
    assert!(sut.crypt_or_decrypt(head, &CTR_IV, 0));
    assert!(sut.crypt_or_decrypt(tail, &CTR_IV, 3));
    assert_eq!(split, whole);
}

#[test]
fn ctr_counter_wraps_at_i64_max() {
    let sut = Ctr::from_hex(DEFAULT_KEY).unwrap();
    let mut wrapped = payload(16);
    assert!(sut.crypt_or_decrypt(&mut wrapped, &CTR_IV, i64::MAX));

    let mut second = payload(16);
    assert!(sut.crypt_or_decrypt(&mut second[8..], &CTR_IV, i64::MIN));
    assert_eq!(wrapped[8..], second[8..]);
}

#[test]
fn ctr_rejects_empty_payload_and_bad_iv() {
    let sut = Ctr::from_hex(DEFAULT_KEY).unwrap();
    assert!(!sut.crypt_or_decrypt(&mut [], &CTR_IV, 0));

    let mut buf = payload(17);
    assert!(!sut.crypt_or_decrypt(&mut buf, &CTR_IV[..4], 0));
    assert_eq!(buf, payload(17));
}

#[test]
fn modes_share_one_codec() {
    let codec = Arc::new(Codec::from_hex(DEFAULT_KEY).unwrap());
    let ecb = Ecb::new(codec.clone());
    let ctr = Ctr::new(codec.clone());
    assert!(Arc::ptr_eq(ecb.codec(), ctr.codec()));
    assert_eq!(Arc::strong_count(&codec), 3);
}

#[test]
fn mode_constructors_validate_key() {
    assert!(matches!(Ecb::from_key(&[0u8; 4]), Err(Error::InvalidKeyLength(4))));
    assert!(matches!(Cbc::from_hex("zz"), Err(Error::InvalidHex(_))));
    assert!(Ctr::from_key(b"eight by").is_ok());
}
