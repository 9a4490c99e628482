use std::sync::Arc;

use blowfast::{Codec, Ctr, Ecb, ParallelCtr, ParallelEcb};
use divan::counter::BytesCount;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static KEY16: [u8; 16] = [
    0xA3, 0xBD, 0x61, 0x4B, 0x27, 0x86, 0x4E, 0x3F, 0x85, 0x4B, 0x97, 0x1F, 0x9D, 0xF1, 0xA8, 0x02,
];
static IV: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
static PLAIN_TEXT_8: &str = "abcdefgh";

const LENS: [usize; 4] = [2usize.pow(10), 2usize.pow(14), 2usize.pow(20), 2usize.pow(24)];

fn main() {
    divan::main();
}

fn codec() -> Arc<Codec> {
    Arc::new(Codec::new(&KEY16).unwrap())
}

#[divan::bench]
fn key_schedule() -> Codec {
    Codec::new(divan::black_box(&KEY16)).unwrap()
}

#[divan::bench(args = LENS)]
fn ecb_encrypt(bencher: divan::Bencher, len: usize) {
    let sut = Ecb::new(codec());
    let plain_text = PLAIN_TEXT_8.repeat(len / 8).into_bytes();

    bencher
        .counter(BytesCount::new(len))
        .with_inputs(|| plain_text.clone())
        .bench_local_values(|mut buffer| {
            sut.encrypt(&mut buffer);
            divan::black_box(buffer);
        });
}

#[divan::bench(args = LENS)]
fn ecb_encrypt_par(bencher: divan::Bencher, len: usize) {
    let sut = ParallelEcb::new(codec());
    let plain_text = PLAIN_TEXT_8.repeat(len / 8).into_bytes();

    bencher
        .counter(BytesCount::new(len))
        .with_inputs(|| plain_text.clone())
        .bench_local_values(|mut buffer| {
            sut.encrypt(&mut buffer);
            divan::black_box(buffer);
        });
}

#[divan::bench(args = LENS)]
fn ctr_crypt(bencher: divan::Bencher, len: usize) {
    let sut = Ctr::new(codec());
    let plain_text = PLAIN_TEXT_8.repeat(len / 8).into_bytes();

    bencher
        .counter(BytesCount::new(len))
        .with_inputs(|| plain_text.clone())
        .bench_local_values(|mut buffer| {
            sut.crypt_or_decrypt(&mut buffer, &IV, 0);
            divan::black_box(buffer);
        });
}

#[divan::bench(args = LENS)]
fn ctr_crypt_par(bencher: divan::Bencher, len: usize) {
    let sut = ParallelCtr::new(codec());
    let plain_text = PLAIN_TEXT_8.repeat(len / 8).into_bytes();

    bencher
        .counter(BytesCount::new(len))
        .with_inputs(|| plain_text.clone())
        .bench_local_values(|mut buffer| {
            sut.crypt_or_decrypt(&mut buffer, &IV, 0);
            divan::black_box(buffer);
        });
}
