//! Location fragment handling.
//!
//! The browser-visible location encodes the desired room as
//! `#world?number=<positive integer>`. Parsing is strict about the number
//! (digits only, positive) but tolerant about what follows it, matching how
//! the original surface matched the fragment.

use worldchat_proto::RoomId;

/// Extract the requested room from a location fragment.
///
/// Accepts the fragment with or without its leading `#`. Returns `None` for
/// anything that does not name a positive room number, which callers treat
/// as "no room requested".
pub fn room_from_fragment(fragment: &str) -> Option<RoomId> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    if !fragment.contains("world") {
        return None;
    }

    let (_, rest) = fragment.split_once("number=")?;
    let digits: &str = {
        let end = rest.bytes().take_while(u8::is_ascii_digit).count();
        &rest[..end]
    };

    if digits.is_empty() {
        return None;
    }

    let number: u32 = digits.parse().ok()?;
    RoomId::from_number(number).ok()
}

/// Fragment that reproduces a placement in this room on reload.
pub fn fragment_for_room(room: RoomId) -> String {
    format!("#world?number={}", room.number())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(n: u32) -> RoomId {
        RoomId::from_number(n).unwrap()
    }

    #[test]
    fn well_formed_fragments_parse() {
        assert_eq!(room_from_fragment("#world?number=3"), Some(room(3)));
        assert_eq!(room_from_fragment("world?number=12"), Some(room(12)));
        assert_eq!(room_from_fragment("#world?number=3&from=link"), Some(room(3)));
    }

    #[test]
    fn roomless_fragments_do_not_parse() {
        for fragment in
            ["", "#", "#world", "#world?number=", "#world?number=zero", "#mypage-setting",
             "#world?number=0", "#number=3"]
        {
            assert_eq!(room_from_fragment(fragment), None, "{fragment:?}");
        }
    }

    #[test]
    fn formatting_round_trips() {
        let fragment = fragment_for_room(room(7));
        assert_eq!(fragment, "#world?number=7");
        assert_eq!(room_from_fragment(&fragment), Some(room(7)));
    }
}
