#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub username: String,
    /// Only present when the API exposes it to the authenticated identity.
    pub email: Option<String>,
}

/// A board or list as shown by the discovery commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub id: String,
    pub name: String,
}
