use super::{Caller, IdentityProvider, PassthroughIdentity};
use crate::types::Subject;

#[test]
fn test_passthrough_resolves_session_to_subject() {
    let identity = PassthroughIdentity;

    assert_eq!(identity.resolve(&Caller::with_session(" alice ")), Some(Subject::from("alice")));
}

#[test]
fn test_passthrough_rejects_missing_or_blank_sessions() {
    let identity = PassthroughIdentity;

    assert_eq!(identity.resolve(&Caller::anonymous()), None);
    assert_eq!(identity.resolve(&Caller::with_session("   ")), None);
}
