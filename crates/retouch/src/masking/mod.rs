//! Protected-word masking.
//!
//! Before text is handed to a language model, every occurrence of a
//! protected word is swapped for an opaque token so the model cannot alter
//! it. After the model answers, the tokens are swapped back.
//!
//! # Example
//!
//! ```
//! use retouch::masking::{mask, unmask};
//! use retouch::words::ProtectedWord;
//!
//! let words = vec![ProtectedWord::new("Kubernetes")];
//! let masked = mask("I deploy to kubernetes daily", &words);
//! assert_eq!(masked.masked_text, "I deploy to __CWORD_0__ daily");
//!
//! let restored = unmask(&masked.masked_text, &masked.mapping);
//! assert_eq!(restored, "I deploy to kubernetes daily");
//! ```

mod engine;
mod token;

pub use engine::{mask, unmask, MaskedSpan, MaskingResult};
pub use token::{token_for, token_index, validate_no_collisions, TOKEN_PREFIX, TOKEN_SUFFIX};
