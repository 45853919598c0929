use byzantine_pir::encoder::{Encoding, RecordDatabase};
use divan;
use std::time::Duration;

fn main() {
    divan::main();
}

#[derive(Debug)]
struct DBConfig {
    num_servers: usize,
    record_len: usize,
    num_records: usize,
    elem_byte_len: usize,
}

const ARGS: &[DBConfig] = &[
    DBConfig {
        num_servers: 5,
        record_len: 3,
        num_records: 1usize << 10,
        elem_byte_len: 2,
    },
    DBConfig {
        num_servers: 8,
        record_len: 4,
        num_records: 1usize << 12,
        elem_byte_len: 2,
    },
];

#[divan::bench(args = ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn encode_database(bencher: divan::Bencher, db_config: &DBConfig) {
    let db = RecordDatabase::generate(db_config.record_len, db_config.num_records, db_config.elem_byte_len).unwrap();

    bencher.bench(|| Encoding::new(divan::black_box(db_config.num_servers), divan::black_box(&db)));
}

#[divan::bench(args = ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn distribute_shares(bencher: divan::Bencher, db_config: &DBConfig) {
    let db = RecordDatabase::generate(db_config.record_len, db_config.num_records, db_config.elem_byte_len).unwrap();
    let encoding = Encoding::new(db_config.num_servers, &db).unwrap();

    bencher.bench(|| divan::black_box(&encoding).distribute());
}
