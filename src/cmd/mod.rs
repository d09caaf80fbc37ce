//! CLI command implementations.
//!
//! | Module    | Commands handled                 |
//! |-----------|----------------------------------|
//! | `publish` | default invocation, `Publish`    |
//! | `prune`   | `Prune`                          |

pub mod prune;
pub mod publish;

pub use prune::cmd_prune;
pub use publish::cmd_publish;
