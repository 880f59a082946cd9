#[macro_use]
extern crate afl;
use huddle::{
    DEFAULT_DEVICE_INDEX, GroupCipher, GroupSessionBuilder, MemoryKeyStore, SenderKeyName,
};

fn get_receiver() -> (MemoryKeyStore, SenderKeyName) {
    let name = SenderKeyName::new("fuzz-group", "sender", DEFAULT_DEVICE_INDEX);

    // The sender whose messages the attacker tries to forge
    let mut sender = MemoryKeyStore::new();
    let distribution = GroupSessionBuilder::new(&mut sender)
        .create(&name)
        .expect("Setup failed");

    let mut receiver = MemoryKeyStore::new();
    GroupSessionBuilder::new(&mut receiver)
        .process(&name, &distribution)
        .expect("Setup failed");

    (receiver, name)
}

fn main() {
    let (mut receiver, name) = get_receiver();

    fuzz!(|data: &[u8]| {
        let _ = GroupCipher::new(&mut receiver, name.clone()).decrypt(data);
    });
}
