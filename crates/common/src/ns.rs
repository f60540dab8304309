//! IRI vocabularies interpreted by the server.
//!
//! Constants follow the `oxrdf::vocab` convention: `NamedNodeRef` values
//! checked by eye, constructed with `new_unchecked`.

pub mod acl {
    //! [Web Access Control](http://www.w3.org/ns/auth/acl#) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const ACCESS_TO: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#accessTo");
    pub const DEFAULT_FOR_NEW: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#defaultForNew");
    pub const MODE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#mode");
    pub const AGENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agent");
    pub const AGENT_CLASS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agentClass");
    pub const OWNER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#owner");
    pub const ORIGIN: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#origin");
    pub const DELEGATES: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#delegates");

    pub const READ: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Read");
    pub const WRITE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Write");
    pub const APPEND: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Append");
    pub const CONTROL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Control");
}

pub mod foaf {
    //! The slice of [FOAF](http://xmlns.com/foaf/0.1/) used for agent matching.
    use oxrdf::NamedNodeRef;

    pub const AGENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Agent");
    pub const GROUP: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Group");
    pub const MEMBER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/member");
}

pub mod cert {
    //! [Cert ontology](http://www.w3.org/ns/auth/cert#) terms for WebID keys.
    use oxrdf::NamedNodeRef;

    pub const KEY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#key");
    pub const RSA_PUBLIC_KEY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#RSAPublicKey");
    pub const MODULUS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#modulus");
    pub const EXPONENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#exponent");
}

pub mod ldp {
    //! [Linked Data Platform](http://www.w3.org/ns/ldp#) container terms.
    use oxrdf::NamedNodeRef;

    pub const RESOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Resource");
    pub const CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Container");
    pub const BASIC_CONTAINER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#BasicContainer");
    pub const CONTAINS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#contains");

    /// `Prefer` tokens recognized in `include`/`omit` lists.
    pub const PREFER_CONTAINMENT: &str = "http://www.w3.org/ns/ldp#PreferContainment";
    pub const PREFER_EMPTY_CONTAINER: &str = "http://www.w3.org/ns/ldp#PreferEmptyContainer";
}

pub mod stat {
    //! [POSIX stat](http://www.w3.org/ns/posix/stat#) facts emitted in listings.
    use oxrdf::NamedNodeRef;

    pub const DIRECTORY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#Directory");
    pub const FILE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#File");
    pub const MTIME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#mtime");
    pub const SIZE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#size");
}
