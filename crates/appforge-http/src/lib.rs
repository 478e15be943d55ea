//! # appforge-http
//!
//! HTTP primitives for the appforge view layer: [`HttpRequest`] with GET/POST
//! query dicts and a META map, [`HttpResponse`] with helper constructors, and
//! session-backed flash messages.

pub mod flash;
pub mod querydict;
pub mod request;
pub mod response;

pub use flash::{flash, peek_flashes, pop_flashes, FlashLevel, FlashMessage};
pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponseRedirect, JsonResponse};
