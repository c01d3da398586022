use solana_sdk::hash::hashv;
use solsgame_types::{
    event::GAME_PLAYED_DISCRIMINATOR, OperationKind, CASINO_ACCOUNT_DISCRIMINATOR,
};

fn main() {
    for kind in OperationKind::ALL {
        let preimage = format!("global:{}", kind.instruction_name());
        let computed = &hashv(&[preimage.as_bytes()]).to_bytes()[..8];
        let status = if computed == kind.discriminator() {
            "ok"
        } else {
            "MISMATCH"
        };
        println!("{kind}:");
        println!("  table    {:?}", kind.discriminator());
        println!("  computed {computed:?} {status}");
    }

    for (name, preimage, table) in [
        ("GamePlayed", "event:GamePlayed", GAME_PLAYED_DISCRIMINATOR),
        ("Casino", "account:Casino", CASINO_ACCOUNT_DISCRIMINATOR),
    ] {
        let computed = &hashv(&[preimage.as_bytes()]).to_bytes()[..8];
        println!("{name}:");
        println!("  table    {table:?}");
        println!("  computed {computed:?}");
    }
}
