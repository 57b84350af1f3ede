use structured_event_log::codec::{compress, decompress};
use structured_event_log::dictionary::Dictionary;

use proptest::prelude::*;
use rand::Rng;

fn round_trip(input: &[u8], packet_size: usize) -> Vec<u8> {
    let mut enc_dict = Dictionary::new();
    let mut compressed = Vec::new();
    let mut pos = 0;
    let mut remaining_in_packet = packet_size;
    while pos < input.len() {
        if remaining_in_packet == 0 {
            enc_dict.reset();
            remaining_in_packet = packet_size;
        }
        let mut buf = vec![0u8; packet_size];
        let outcome = compress(&mut enc_dict, &input[pos..], &mut buf, remaining_in_packet);
        compressed.extend_from_slice(&buf[..outcome.output_len]);
        remaining_in_packet -= outcome.output_len;
        pos += outcome.input_consumed;
    }

    let mut dec_dict = Dictionary::new();
    let mut output = Vec::new();
    let mut pos = 0;
    let mut remaining_in_packet = packet_size;
    while pos < compressed.len() {
        if remaining_in_packet == 0 {
            dec_dict.reset();
            remaining_in_packet = packet_size;
        }
        let mut buf = vec![0u8; input.len().max(1) + packet_size];
        let outcome = decompress(&mut dec_dict, &compressed[pos..], &mut buf, remaining_in_packet.min(compressed.len() - pos));
        output.extend_from_slice(&buf[..outcome.output_len]);
        remaining_in_packet -= outcome.input_consumed;
        pos += outcome.input_consumed;
        if outcome.input_consumed == 0 {
            break;
        }
    }
    output
}

#[test]
fn scenario_round_trip_sentence() {
    let input = b"packets are independent of each other by design of the dictionary reset";
    assert_eq!(round_trip(input, 1024), input);
}

#[test]
fn packets_are_independently_decodable() {
    // compress two different packets, each against a freshly-seeded dictionary, and
    // confirm decompressing the second alone (without the first) still works.
    let mut dict = Dictionary::new();
    let mut first = [0u8; 1024];
    let o1 = compress(&mut dict, b"first packet contents", &mut first, 1024);
    dict.reset();
    let mut second = [0u8; 1024];
    let o2 = compress(&mut dict, b"second packet, unrelated text", &mut second, 1024);

    let mut fresh_dict = Dictionary::new();
    let mut out = [0u8; 64];
    let outcome = decompress(&mut fresh_dict, &second[..o2.output_len], &mut out, o2.output_len);
    assert_eq!(&out[..outcome.output_len], b"second packet, unrelated text");
    let _ = o1;
}

proptest! {
    #[test]
    fn round_trip_is_identity(bytes in proptest::collection::vec(any::<u8>(), 0..400)) {
        let out = round_trip(&bytes, 1024);
        prop_assert_eq!(out, bytes);
    }

    #[test]
    fn ascii_text_without_runs_does_not_expand(s in "[a-zA-Z0-9 ]{0,120}") {
        let mut dict = Dictionary::new();
        let mut compressed = vec![0u8; 512];
        let outcome = compress(&mut dict, s.as_bytes(), &mut compressed, 512);
        prop_assert!(outcome.output_len <= s.len() * 2);
    }
}

#[test]
fn randomized_round_trip_many_sizes() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let len = rng.gen_range(0..2000);
        let input: Vec<u8> = (0..len).map(|_| rng.gen::<u8>()).collect();
        let out = round_trip(&input, 1024);
        assert_eq!(out, input);
    }
}
