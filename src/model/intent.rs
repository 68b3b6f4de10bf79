use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Browsable,
}

/// A request to open `data` (optionally typed with `mime`), optionally
/// pinned to one handler package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: Action,
    pub categories: Vec<Category>,
    pub data: Url,
    pub mime: Option<String>,
    pub package: Option<String>,
}

impl Intent {
    pub fn view(data: Url) -> Self {
        Intent {
            action: Action::View,
            categories: Vec::new(),
            data,
            mime: None,
            package: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// What a resolver reports for each handler able to take an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub package: String,
    pub label: String,
    pub enabled: bool,
    pub exported: bool,
}

/// A handler offered to the user: a concrete intent pinned to its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserCandidate {
    pub package: String,
    pub label: String,
    pub intent: Intent,
}
