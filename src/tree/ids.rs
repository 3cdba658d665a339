//! Opaque handles returned when registering callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub(crate) fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

handle_id! {
    /// Identifies a root-level subscriber, see `Storage::add_subscriber`.
    SubscriberId
}

handle_id! {
    /// Identifies an observer, see `Storage::add_observer`.
    ObserverId
}

handle_id! {
    /// Identifies a node-scoped data listener, see `State::on_new_data`.
    ListenerId
}
