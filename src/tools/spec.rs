//! Tool declarations.

use super::schema::Signature;

/// Declaration metadata for a tool callable.
///
/// Pairs the declared name, description and required parameters with the
/// callable's [`Signature`]. Turned into a descriptor by
/// [`synthesize`](super::schema::synthesize) when the tool is built.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    required: Vec<String>,
    doc: Option<String>,
    signature: Signature,
    artifact: bool,
    expose_optional: bool,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: Vec::new(),
            doc: None,
            signature: Signature::function(),
            artifact: false,
            expose_optional: true,
        }
    }

    /// Declared required parameters. Duplicates are dropped.
    pub fn required<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for param in params {
            let param = param.into();
            if !self.required.contains(&param) {
                self.required.push(param);
            }
        }
        self
    }

    /// Doc comment carrying `:param <name>: <text>` lines.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Mark the tool as producing an artifact for the display surface.
    pub fn artifact(mut self) -> Self {
        self.artifact = true;
        self
    }

    /// Export only the required parameters to the model.
    pub fn required_only(mut self) -> Self {
        self.expose_optional = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required_params(&self) -> &[String] {
        &self.required
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn callable_signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_artifact(&self) -> bool {
        self.artifact
    }

    pub fn exposes_optional(&self) -> bool {
        self.expose_optional
    }
}
