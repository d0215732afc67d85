//! Message store properties: pairing, removal, clearing

use chatframe::{Error, MessageStore, Role};

fn filled(pairs: usize) -> MessageStore {
    let mut s = MessageStore::new();
    for i in 0..pairs {
        s.append_pair(&format!("user {}", i), &format!("assistant {}", i))
            .expect("valid pair");
    }
    s
}

#[test]
fn append_pair_grows_by_two_with_user_first() {
    let inputs = [("hi", "hello"), ("  padded  ", "x"), ("多行\n文本", "回答"), ("a", "b\n\nc")];
    let mut s = MessageStore::new();
    for (u, a) in inputs {
        let before = s.len();
        s.append_pair(u, a).unwrap();
        assert_eq!(s.len(), before + 2);
        let msgs = s.messages();
        assert_eq!(msgs[before].role, Role::User);
        assert_eq!(msgs[before].content, u);
        assert_eq!(msgs[before + 1].role, Role::Assistant);
        assert_eq!(msgs[before + 1].content, a);
    }
}

#[test]
fn append_pair_rejects_blank_sides() {
    let mut s = filled(1);
    for (u, a) in [("", "x"), ("x", ""), ("   ", "x"), ("x", "\t\n "), ("", "")] {
        assert!(matches!(s.append_pair(u, a), Err(Error::Validation(_))));
        assert_eq!(s.len(), 2);
    }
}

#[test]
fn remove_pair_drops_exactly_the_targeted_pair() {
    for target in 0..4 {
        for index in [target * 2, target * 2 + 1] {
            let mut s = filled(4);
            assert!(s.remove_pair(index));
            assert_eq!(s.len(), 6);
            let remaining: Vec<_> = s.pairs().map(|(u, _)| u.content.clone()).collect();
            let expected: Vec<_> = (0..4)
                .filter(|i| *i != target)
                .map(|i| format!("user {}", i))
                .collect();
            assert_eq!(remaining, expected);
            for (u, a) in s.pairs() {
                assert_eq!(u.role, Role::User);
                assert_eq!(a.role, Role::Assistant);
            }
        }
    }
}

#[test]
fn remove_pair_out_of_range_is_a_noop() {
    let mut s = filled(2);
    let rev = s.revision();
    assert!(!s.remove_pair(4));
    assert!(!s.remove_pair(usize::MAX));
    assert_eq!(s.len(), 4);
    assert_eq!(s.revision(), rev);
}

#[test]
fn clear_empties_or_reports_nothing_to_clear() {
    let mut s = filled(3);
    s.clear().unwrap();
    assert_eq!(s.len(), 0);
    assert!(matches!(s.clear(), Err(Error::NothingToClear)));
    assert_eq!(s.len(), 0);
}
