use commonware_codec::ReadExt;
use solsgame_types::{lamports_to_sol, Operation};
use std::env;

fn main() {
    let hex_str = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: decode-instruction <hex>");
        std::process::exit(1);
    });

    let hex_str = hex_str.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = match hex::decode(hex_str) {
        Ok(bytes) => bytes,
        Err(_) => {
            eprintln!("invalid hex string");
            std::process::exit(1);
        }
    };

    let mut buf = bytes.as_slice();
    let operation = match Operation::read(&mut buf) {
        Ok(operation) => operation,
        Err(err) => {
            eprintln!("decode error: {err}");
            std::process::exit(1);
        }
    };

    println!("instruction: {}", operation.kind());
    println!(
        "amount: {} lamports ({} SOL)",
        operation.amount(),
        lamports_to_sol(operation.amount())
    );
    println!("decoded: {operation:?}");
    println!("remaining bytes: {}", buf.len());
}
