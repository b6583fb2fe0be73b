#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_safer_core::{yaml_parser_load, Parser};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut parser = Parser::new();
    parser.set_input(&mut data);

    while let Ok(document) = yaml_parser_load(&mut parser) {
        if document.nodes.is_empty() {
            break;
        }
    }
}
