#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_safer_core::yaml_parser_scan;

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let _ = yaml_parser_scan(&mut data);
}
