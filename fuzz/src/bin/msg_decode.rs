#[macro_use]
extern crate afl;
use huddle::{Envelope, SenderKeyDistributionMessage, SenderKeyMessage, padding};

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = SenderKeyMessage::deserialize(data);
        let _ = SenderKeyDistributionMessage::deserialize(data);
        let _ = padding::unpad(data);
        if let Ok(json) = std::str::from_utf8(data) {
            let _ = Envelope::from_json(json);
        }
    });
}
