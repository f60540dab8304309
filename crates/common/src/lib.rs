/**
 * Authenticated token envelopes.
 *  Backs the `Session` cookie and the short-lived
 *  WWW-Authenticate nonces minted by the access
 *  control engine.
 */
pub mod crypto;
/**
 * IRI vocabularies the server interprets (WAC, FOAF,
 *  cert, LDP, POSIX stat), as `NamedNodeRef` constants
 *  in the style of `oxrdf::vocab`.
 */
pub mod ns;
/**
 * The RDF graph collaborator: an `oxrdf` triple set
 *  bound to a document URI, with turtle/JSON-LD I/O,
 *  triple-level JSON patches and a ground-data
 *  SPARQL-Update subset.
 */
pub mod rdf;

pub mod prelude {
    pub use crate::crypto::envelope::{EnvelopeError, Keyring};
    pub use crate::ns;
    pub use crate::rdf::{Graph, RdfError};
}
