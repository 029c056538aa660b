//! Core traits - Seams for alternate transports and client mocks

use async_trait::async_trait;

use crate::core::{Payload, RequestBody, ResponseEnvelope, Result, SignedRequest};

/// ICO listing fetched when no kind is given
pub const DEFAULT_ICO_LIST: &str = "all";

/// People listing fetched when no kind is given
pub const DEFAULT_PEOPLE_LIST: &str = "registered";

/// HTTP transport - delivers a signed request and reports what came back
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request.body` to `request.path` relative to the API root.
    ///
    /// Any HTTP status is a successful transport call; only connection-level
    /// failures are errors here.
    async fn post(&self, request: &SignedRequest) -> Result<ResponseEnvelope>;
}

/// ICObench read API
#[async_trait]
pub trait IcoBenchApi: Send + Sync {
    /// `icos/{kind}`
    async fn get_icos(&self, kind: &str, data: RequestBody) -> Result<Payload>;

    /// `ico/{id}`
    async fn get_ico(&self, id: &str, data: RequestBody) -> Result<Payload>;

    /// `other/{kind}`, always with an empty body
    async fn get_other(&self, kind: &str) -> Result<Payload>;

    /// `people/{kind}`
    async fn get_people(&self, kind: &str, data: RequestBody) -> Result<Payload>;

    /// `icos/all` with an empty body
    async fn all_icos(&self) -> Result<Payload> {
        self.get_icos(DEFAULT_ICO_LIST, RequestBody::new()).await
    }

    /// `people/registered` with an empty body
    async fn registered_people(&self) -> Result<Payload> {
        self.get_people(DEFAULT_PEOPLE_LIST, RequestBody::new()).await
    }
}
