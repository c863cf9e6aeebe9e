//! Request and response types of the I14Y structure editor HTTP API.
//!
//! Every JSON response carries a `success` flag. Failures use
//! [`ErrorResponse`], whose `error` field is one of the
//! [`i14y_structure::ErrorKind`] names.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/nodes` | [`CreateNodeRequest`] → [`NodeResponse`] |
//! | PUT | `/nodes/{id}` | [`i14y_structure::NodePatch`] → [`NodeResponse`] |
//! | DELETE | `/nodes/{id}` | → [`SuccessResponse`] |
//! | POST | `/nodes/{id}/position` | [`PositionRequest`] → [`NodeResponse`] |
//! | POST | `/nodes/{id}/convert-to-dataset` | → [`NodeResponse`] |
//! | POST | `/nodes/{id}/concept` | [`ApplyConceptRequest`] → [`NodeResponse`] |
//! | POST | `/connect` | [`ConnectRequest`] → [`EdgeResponse`] |
//! | PUT | `/edges/{id}` | [`CardinalityRequest`] → [`EdgeResponse`] |
//! | DELETE | `/edges/{id}` | → [`SuccessResponse`] |
//! | GET | `/graph` | → [`i14y_structure::GraphData`] |
//! | GET | `/export/ttl` | → `text/turtle` |
//! | POST | `/import/{ttl,csv,xsd}` | multipart, [`ImportParams`] → [`ImportResponse`] |
//! | GET | `/project/save` | → [`i14y_structure::project::ProjectFile`] |
//! | POST | `/project/load` | multipart → [`ImportResponse`] |
//! | POST | `/project/new` | [`NewProjectRequest`] → [`GraphResponse`] |
//! | GET | `/concepts/search` | [`SearchQuery`] → [`ConceptSearchResponse`] |
//! | GET | `/datasets/search` | [`SearchQuery`] → [`DatasetSearchResponse`] |
//! | POST | `/dataset/link` | [`LinkDatasetRequest`] → [`DatasetLinkResponse`] |
//! | POST | `/dataset/unlink` | → [`DatasetLinkResponse`] |
//! | GET | `/health` | → [`HealthResponse`] |

pub mod catalogue;
pub mod error;
pub mod graph;
pub mod node;

pub use catalogue::{
    ConceptSearchResponse, ConceptSummary, DatasetLinkResponse, DatasetSearchResponse,
    DatasetSummary, LinkDatasetRequest, SearchQuery,
};
pub use error::ErrorResponse;
pub use graph::{
    GraphResponse, HealthResponse, ImportParams, ImportResponse, NewProjectRequest,
    SuccessResponse,
};
pub use node::{
    ApplyConceptRequest, CardinalityRequest, ConnectRequest, CreateNodeRequest, EdgeResponse,
    NodeResponse, PositionRequest,
};
