use std::num::NonZeroUsize;
use std::sync::Arc;

use blowfast::{
    Codec, Ctr, Ecb, ParallelCtr, ParallelEcb, ParallelOptions, DEFAULT_MIN_PARALLEL_LEN,
};

static DEFAULT_KEY: &str = "a3bd614b27864e3f854b971f9df1a802";
static IV: [u8; 8] = [0x10, 0x32, 0x54, 0x76, 0x98, 0xBA, 0xDC, 0xFE];

// Below, at and above the threshold, with and without a partial batch.
const ALIGNED_SIZES: [usize; 8] = [8, 64, 128, 1024, 4088, 4096, 4104, 65_536 + 24];
const CTR_SIZES: [usize; 8] = [1, 7, 17, 513, 4095, 4096, 4097, 65_536 + 29];

fn payload(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

fn codec() -> Arc<Codec> {
    Arc::new(Codec::from_hex(DEFAULT_KEY).unwrap())
}

fn options_for_tests() -> ParallelOptions {
    ParallelOptions::default()
        .with_min_parallel_len(64)
        .with_max_degree(NonZeroUsize::new(4).unwrap())
}

#[test]
fn default_options() {
    let options = ParallelOptions::default();
    assert_eq!(options.min_parallel_len, DEFAULT_MIN_PARALLEL_LEN);
    assert_eq!(options.min_parallel_len, 4096);
    assert_eq!(options.max_degree, None);
    assert_eq!(ParallelEcb::new(codec()).options(), &options);
}

#[test]
fn parallel_ecb_matches_serial() {
    let codec = codec();
    let serial = Ecb::new(codec.clone());
    let parallel = [
        ParallelEcb::new(codec.clone()),
        ParallelEcb::with_options(codec, options_for_tests()).unwrap(),
    ];

    for n in ALIGNED_SIZES {
        let mut expected = payload(n);
        assert!(serial.encrypt(&mut expected));

        for sut in &parallel {
            let mut data = payload(n);
            assert!(sut.encrypt(&mut data));
            assert_eq!(data, expected, "encrypt len {n}");
            assert!(sut.decrypt(&mut data));
            assert_eq!(data, payload(n), "decrypt len {n}");
        }
    }
}

#[test]
fn parallel_ctr_matches_serial() {
    let codec = codec();
    let serial = Ctr::new(codec.clone());
    let parallel = [
        ParallelCtr::new(codec.clone()),
        ParallelCtr::with_options(codec, options_for_tests()).unwrap(),
    ];

    for n in CTR_SIZES {
        for counter in [0i64, 9, -3] {
            let mut expected = payload(n);
            assert!(serial.crypt_or_decrypt(&mut expected, &IV, counter));

            for sut in &parallel {
                let mut data = payload(n);
                assert!(sut.crypt_or_decrypt(&mut data, &IV, counter));
                assert_eq!(data, expected, "len {n} counter {counter}");
                assert!(sut.crypt_or_decrypt(&mut data, &IV, counter));
                assert_eq!(data, payload(n));
            }
        }
    }
}

#[test]
fn single_thread_pool_stays_serial_and_correct() {
    let options = ParallelOptions::default()
        .with_min_parallel_len(8)
        .with_max_degree(NonZeroUsize::new(1).unwrap());
    let sut = ParallelCtr::with_options(codec(), options).unwrap();
    let mut data = payload(8192 + 3);
    let mut expected = payload(8192 + 3);
    assert!(Ctr::new(codec()).crypt_or_decrypt(&mut expected, &IV, 0));
    assert!(sut.crypt_or_decrypt(&mut data, &IV, 0));
    assert_eq!(data, expected);
}

#[test]
fn parallel_ecb_rejects_non_padded_payload() {
    let sut = ParallelEcb::with_options(codec(), options_for_tests()).unwrap();
    let mut buf = payload(4097);
    assert!(!sut.encrypt(&mut buf));
    assert!(!sut.decrypt(&mut buf));
    assert_eq!(buf, payload(4097));
    assert!(!sut.encrypt(&mut []));
}

#[test]
fn parallel_ctr_accepts_non_padded_payload() {
    let sut = ParallelCtr::from_hex(DEFAULT_KEY).unwrap();
    let mut buf = vec![0u8; 17];
    assert!(sut.crypt_or_decrypt(&mut buf, &IV, 0));
}

#[test]
fn parallel_ctr_rejects_bad_iv() {
    let sut = ParallelCtr::with_options(codec(), options_for_tests()).unwrap();
    let mut buf = payload(8192);
    assert!(!sut.crypt_or_decrypt(&mut buf, &IV[..7], 0));
    assert!(!sut.crypt_or_decrypt(&mut [], &IV, 0));
    assert_eq!(buf, payload(8192));
}

#[test]
fn wrappers_are_shareable_across_threads() {
    let sut = Arc::new(ParallelCtr::with_options(codec(), options_for_tests()).unwrap());
    let mut expected = payload(10_000);
    assert!(Ctr::new(codec()).crypt_or_decrypt(&mut expected, &IV, 0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sut = Arc::clone(&sut);
            std::thread::spawn(move || {
                let mut data = payload(10_000);
                assert!(sut.crypt_or_decrypt(&mut data, &IV, 0));
                data
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
