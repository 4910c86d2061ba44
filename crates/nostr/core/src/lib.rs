pub mod fakejson;
pub mod fetch;
pub mod filter;
pub mod keys;
pub mod nip01;
pub mod nip04;
pub mod nip05;
pub mod nip06;
pub mod nip10;
pub mod nip19;
pub mod nip26;
pub mod nip27;
pub mod nip39;
mod tag_parsing;

pub use fetch::{FetchError, HttpFetch};
pub use filter::{Filter, match_filter, match_filters};
pub use keys::{Keypair, generate_secret_key, get_public_key, get_public_key_hex, secret_key_from_hex};
pub use nip01::{
    Event, EventTemplate, KindClassification, UnsignedEvent, ValidationError, blank_event,
    finish_event, get_event_hash, serialize_event, sign_event, sort_events, validate_event,
    validate_event_value, verify_event,
};
pub use nip05::Nip05Resolver;
pub use nip06::{derive_keypair, derive_keypair_with_account, private_key_from_seed_words};
pub use nip19::{AddressPointer, CodecError, EventPointer, Nip19, ProfilePointer};
