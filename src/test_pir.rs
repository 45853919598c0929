#![cfg(test)]

use crate::{BPIRError, Client, Config, Encoding, ErrorKind, RecordDatabase, Response, Server, encoder, inject_fault};
use num_bigint::BigInt;
use test_case::test_case;

const SCENARIO_CONFIG: &str = "
    num_bytes=2
    m=4
    n=5
    l=3
    I=2
    errorCount=2
    a=7
    b=13
";

fn setup_scenario() -> (Config, RecordDatabase, Vec<Server>, Client) {
    let config = Config::from_kv_str(SCENARIO_CONFIG).expect("Scenario configuration must be valid");
    let db = RecordDatabase::generate(config.record_len, config.num_records, config.elem_byte_len).expect("Failed to generate database");
    let (servers, client) = encoder::setup(&config, &db).expect("Setup failed");

    (config, db, servers, client)
}

#[test_case(5, 3, 4; "More servers than record blocks")]
#[test_case(4, 4, 8; "As many servers as record blocks")]
#[test_case(6, 2, 16; "Highly redundant encoding")]
fn every_uncorrupted_record_decodes_exactly(num_servers: usize, record_len: usize, num_records: usize) {
    let db = RecordDatabase::generate(record_len, num_records, 2).expect("Failed to generate database");
    let encoding = Encoding::new(num_servers, &db).expect("Encoding failed");
    let servers = encoding.distribute().expect("Distribution failed");
    let client = Client::setup(&encoding, 3, 5).expect("Client setup failed");

    for target_index in 0..num_records {
        let retrieval = client.retrieve(&servers, target_index, &[]).expect("Retrieval failed");

        assert!(retrieval.dishonest.is_empty());
        assert_eq!(retrieval.record, db.record(target_index).unwrap());
    }
}

#[test]
fn two_dishonest_servers_out_of_five_are_caught_and_recovered_from() {
    let (config, db, servers, client) = setup_scenario();
    let simulated_dishonest = (0..config.dishonest_count).collect::<Vec<usize>>();

    let retrieval = client.retrieve(&servers, config.target_index, &simulated_dishonest).expect("Retrieval failed");

    assert_eq!(retrieval.dishonest, vec![0, 1]);
    assert_eq!(retrieval.record.len(), config.record_len);
    assert_eq!(retrieval.record, db.record(config.target_index).unwrap());
}

#[test_case(vec![]; "No dishonest server")]
#[test_case(vec![4]; "Last server lies")]
#[test_case(vec![1, 3]; "Non-contiguous dishonest servers")]
#[test_case(vec![0, 2, 4]; "Dishonest majority")]
#[test_case(vec![0, 1, 2, 3]; "Single honest server")]
#[test_case(vec![0, 1, 2, 3, 4]; "Every server lies")]
fn record_is_recovered_under_any_dishonest_subset(dishonest: Vec<usize>) {
    let (_, db, servers, client) = setup_scenario();

    for target_index in 0..client.num_records() {
        let retrieval = client.retrieve(&servers, target_index, &dishonest).expect("Retrieval failed");

        assert_eq!(retrieval.dishonest, dishonest);
        assert_eq!(retrieval.record, db.record(target_index).unwrap());
    }
}

#[test]
fn repeated_retrievals_yield_same_record() {
    let (config, _, servers, client) = setup_scenario();

    let first = client.retrieve(&servers, config.target_index, &[1, 4]).expect("Retrieval failed");
    let second = client.retrieve(&servers, config.target_index, &[1, 4]).expect("Retrieval failed");

    assert_eq!(first, second);
}

#[test]
fn lying_server_with_consistent_response_is_detected_by_commitment() {
    let (config, db, servers, client) = setup_scenario();
    let b = BigInt::from(config.blinding_b);

    let queries = client.query(config.target_index).expect("Query generation failed");
    let mut responses = servers
        .iter()
        .zip(&queries)
        .map(|(server, query)| server.respond(query).expect("Server failed to respond"))
        .collect::<Vec<Response>>();

    // Still exactly divisible by `b`, so only the commitment check can catch it.
    responses[3].a2 += &b * 1000;

    let retrieval = client.process_responses(config.target_index, &responses).expect("Processing failed");

    assert_eq!(retrieval.dishonest, vec![3]);
    assert_eq!(retrieval.record, db.record(config.target_index).unwrap());
}

#[test]
fn response_not_divisible_by_blinding_scalar_is_reported() {
    let (config, _, servers, client) = setup_scenario();

    let queries = client.query(config.target_index).expect("Query generation failed");
    let mut responses = servers
        .iter()
        .zip(&queries)
        .map(|(server, query)| server.respond(query).expect("Server failed to respond"))
        .collect::<Vec<Response>>();

    responses[2].a2 += 1;

    let res = client.process_responses(config.target_index, &responses);
    assert_eq!(res, Err(BPIRError::NonExactResponseDivision(2)));
    assert_eq!(res.unwrap_err().kind(), ErrorKind::Tampering);
}

#[test]
fn retrieval_over_serialized_messages() {
    let (config, db, servers, client) = setup_scenario();

    let queries = client.query(config.target_index).expect("Query generation failed");
    let responses = servers
        .iter()
        .zip(&queries)
        .map(|(server, query)| {
            let response_bytes = server.respond_to_bytes(&query.to_bytes()).expect("Server failed to respond");
            Response::from_bytes(&response_bytes).expect("Failed to deserialize response")
        })
        .collect::<Vec<Response>>();

    let mut raw = client.combine_responses(&responses).expect("Combining failed");
    inject_fault(&[2], &mut raw).expect("Fault injection failed");

    let retrieval = client.recover_record(config.target_index, &raw).expect("Recovery failed");

    assert_eq!(retrieval.dishonest, vec![2]);
    assert_eq!(retrieval.record, db.record(config.target_index).unwrap());
}

#[test]
fn wide_dishonest_set_never_yields_wrong_record() {
    let (num_servers, record_len, num_records) = (10, 5, 4);
    let dishonest = (0..9).collect::<Vec<usize>>();

    for _ in 0..8 {
        let db = RecordDatabase::generate(record_len, num_records, 2).expect("Failed to generate database");
        let encoding = Encoding::new(num_servers, &db).expect("Encoding failed");
        let servers = encoding.distribute().expect("Distribution failed");
        let client = Client::setup(&encoding, 3, 5).expect("Client setup failed");

        for target_index in 0..num_records {
            match client.retrieve(&servers, target_index, &dishonest) {
                Ok(retrieval) => {
                    assert_eq!(retrieval.dishonest, dishonest);
                    assert_eq!(retrieval.record, db.record(target_index).unwrap());
                }
                Err(err) => assert_eq!(err.kind(), ErrorKind::Numerical, "unexpected error: {}", err),
            }
        }
    }
}

#[test]
fn setup_rejects_mismatching_database() {
    let (config, _, _, _) = setup_scenario();
    let db = RecordDatabase::generate(config.record_len, config.num_records + 1, config.elem_byte_len).expect("Failed to generate database");

    assert!(matches!(encoder::setup(&config, &db), Err(BPIRError::DatabaseShapeMismatch((3, 4), (3, 5)))));
}
