//! Static compatibility table.
//!
//! | Side A | Side B | Connectable |
//! |--------|--------|-------------|
//! | `XInterface` | `complement(X)Interface` | yes (container ↔ container) |
//! | `XInterface` | `complement(X)Converter` | yes (container ↔ robot) |
//! | `XInterface` | `complement(X)Forwarder` | yes (container ↔ robot) |
//! | robot-side | robot-side | no |
//! | any | non-complementary kind | no |

use shared_types::{Binding, InterfaceType};

use super::errors::{ConnectionError, ConnectionResult};

/// Check that two interface types may be connected, in either order.
pub fn check_connectable(a: InterfaceType, b: InterfaceType) -> ConnectionResult<()> {
    let kinds_pair = a.kind.complement() == b.kind;
    let bindings_pair = a.binding == Binding::Interface || b.binding == Binding::Interface;

    if kinds_pair && bindings_pair {
        Ok(())
    } else {
        Err(ConnectionError::NotConnectable {
            first: a.to_string(),
            second: b.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> InterfaceType {
        s.parse().unwrap()
    }

    #[test]
    fn test_producer_consumer() {
        assert!(check_connectable(t("PublisherInterface"), t("SubscriberInterface")).is_ok());
        assert!(check_connectable(t("SubscriberInterface"), t("PublisherInterface")).is_ok());
        assert!(check_connectable(t("PublisherInterface"), t("SubscriberConverter")).is_ok());
        assert!(check_connectable(t("SubscriberForwarder"), t("PublisherInterface")).is_ok());
    }

    #[test]
    fn test_client_provider() {
        assert!(check_connectable(t("ServiceClientInterface"), t("ServiceProviderInterface")).is_ok());
        assert!(check_connectable(t("ServiceProviderConverter"), t("ServiceClientInterface")).is_ok());
    }

    #[test]
    fn test_same_kind_rejected() {
        assert!(check_connectable(t("PublisherInterface"), t("PublisherInterface")).is_err());
        assert!(check_connectable(t("PublisherInterface"), t("ServiceProviderInterface")).is_err());
    }

    #[test]
    fn test_robot_to_robot_rejected() {
        let err = check_connectable(t("PublisherConverter"), t("SubscriberForwarder")).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::NotConnectable {
                first: "PublisherConverter".into(),
                second: "SubscriberForwarder".into(),
            }
        );
    }
}
