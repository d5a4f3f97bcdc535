//! Interactive action categories and the host category registry.
//!
//! Categories are process-wide host state. This module only ever merges: the
//! registrar reads the current set, inserts or overwrites one entry, and
//! writes the union back. Entries are never removed here.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    tokio::sync::RwLock,
    tracing::{debug, warn},
};

use crate::{
    error::Result,
    payload::{ActionButton, ButtonStyle, PayloadMeta},
};

/// Text-input behavior attached to a text-input style action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputAction {
    pub button_title: String,
    pub placeholder: String,
}

/// One interactive action inside a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAction {
    pub id: String,
    pub title: String,
    /// Launches the app when tapped.
    pub foreground: bool,
    pub authentication_required: bool,
    pub destructive: bool,
    pub text_input: Option<TextInputAction>,
}

impl CategoryAction {
    /// Derive host action flags from a parsed button.
    pub fn from_button(button: &ActionButton) -> Self {
        Self {
            id: button.id.clone(),
            title: button.title.clone(),
            foreground: button.opens_app,
            authentication_required: button.requires_unlock || button.opens_app,
            destructive: button.style == ButtonStyle::Destructive,
            text_input: (button.style == ButtonStyle::TextInput).then(|| TextInputAction {
                button_title: button.input_button_title.clone(),
                placeholder: button.input_placeholder.clone(),
            }),
        }
    }
}

/// A named set of actions, keyed by message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub actions: Vec<CategoryAction>,
}

/// Narrow view of the host's process-wide category registry.
#[async_trait]
pub trait CategoryRegistry: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Category>>;
    async fn set_all(&self, categories: Vec<Category>) -> Result<()>;
}

/// Registry stand-in for hosts without a native one, and for tests.
#[derive(Default)]
pub struct InMemoryCategoryRegistry {
    categories: RwLock<HashMap<String, Category>>,
}

impl InMemoryCategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRegistry for InMemoryCategoryRegistry {
    async fn get_all(&self) -> Result<Vec<Category>> {
        Ok(self.categories.read().await.values().cloned().collect())
    }

    async fn set_all(&self, categories: Vec<Category>) -> Result<()> {
        let mut map = self.categories.write().await;
        *map = categories.into_iter().map(|c| (c.id.clone(), c)).collect();
        Ok(())
    }
}

/// Derives the category for one invocation and merges it into the registry.
pub struct CategoryRegistrar {
    registry: Arc<dyn CategoryRegistry>,
}

impl CategoryRegistrar {
    pub fn new(registry: Arc<dyn CategoryRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the category identifier for one request.
    ///
    /// A non-empty sender-set identifier is reused verbatim without touching
    /// the registry. Otherwise a category built from the parsed buttons is
    /// merged under the message id. No message id means no category, and
    /// registry failures degrade to no category.
    pub async fn register(&self, preset: Option<&str>, meta: &PayloadMeta) -> Option<String> {
        if let Some(preset) = preset.filter(|s| !s.is_empty()) {
            debug!(category = preset, "reusing sender-set category");
            return Some(preset.to_owned());
        }
        let message_id = meta.message_id.as_deref()?;

        let category = Category {
            id: message_id.to_owned(),
            actions: meta.buttons.iter().map(CategoryAction::from_button).collect(),
        };
        match self.merge(category).await {
            Ok(()) => Some(message_id.to_owned()),
            Err(e) => {
                warn!(message_id, error = %e, "category registry merge failed, continuing without category");
                None
            },
        }
    }

    /// Read-modify-write against the host registry: snapshot, insert or
    /// overwrite this entry, write the union back.
    async fn merge(&self, category: Category) -> Result<()> {
        let mut by_id: HashMap<String, Category> = self
            .registry
            .get_all()
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        by_id.insert(category.id.clone(), category);
        self.registry.set_all(by_id.into_values().collect()).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn button(style: ButtonStyle, opens_app: bool, requires_unlock: bool) -> ActionButton {
        ActionButton {
            id: "a".into(),
            title: "Yes".into(),
            style,
            opens_app,
            requires_unlock,
            input_button_title: String::new(),
            input_placeholder: String::new(),
        }
    }

    #[test]
    fn destructive_button_without_unlock_or_open_needs_no_auth() {
        let action =
            CategoryAction::from_button(&button(ButtonStyle::Destructive, false, false));
        assert!(action.destructive);
        assert!(
            !action.authentication_required,
            "neither openApp nor requiresUnlock is set, so no auth is needed"
        );
        assert!(!action.foreground);
        assert!(action.text_input.is_none());
    }

    #[test]
    fn opening_the_app_requires_authentication() {
        let action = CategoryAction::from_button(&button(ButtonStyle::Default, true, false));
        assert!(action.foreground);
        assert!(action.authentication_required);
        assert!(!action.destructive);
    }

    #[test]
    fn unlock_requirement_alone_requires_authentication() {
        let action = CategoryAction::from_button(&button(ButtonStyle::Default, false, true));
        assert!(!action.foreground);
        assert!(action.authentication_required);
    }

    #[test]
    fn text_input_button_carries_prompt() {
        let mut b = button(ButtonStyle::TextInput, true, false);
        b.input_button_title = "Send".into();
        b.input_placeholder = "Reply".into();
        let action = CategoryAction::from_button(&b);
        let input = action.text_input.unwrap();
        assert_eq!(input.button_title, "Send");
        assert_eq!(input.placeholder, "Reply");
    }

    /// Registry double that counts round trips.
    #[derive(Default)]
    struct CountingRegistry {
        inner: InMemoryCategoryRegistry,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl CategoryRegistry for CountingRegistry {
        async fn get_all(&self) -> Result<Vec<Category>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_all().await
        }

        async fn set_all(&self, categories: Vec<Category>) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_all(categories).await
        }
    }

    /// Registry double whose writes always fail.
    struct BrokenRegistry;

    #[async_trait]
    impl CategoryRegistry for BrokenRegistry {
        async fn get_all(&self) -> Result<Vec<Category>> {
            Ok(Vec::new())
        }

        async fn set_all(&self, _categories: Vec<Category>) -> Result<()> {
            Err(Error::registry_unavailable("registry is down"))
        }
    }

    fn meta_with_message_id(id: &str) -> PayloadMeta {
        PayloadMeta {
            message_id: Some(id.into()),
            attachment_url: None,
            buttons: vec![button(ButtonStyle::Default, true, false)],
        }
    }

    #[tokio::test]
    async fn preset_category_is_reused_without_registry_io() {
        let registry = Arc::new(CountingRegistry::default());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        let id = registrar
            .register(Some("news"), &meta_with_message_id("m1"))
            .await;

        assert_eq!(id.as_deref(), Some("news"));
        assert_eq!(registry.reads.load(Ordering::SeqCst), 0);
        assert_eq!(registry.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_preset_is_ignored() {
        let registry = Arc::new(InMemoryCategoryRegistry::new());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        let id = registrar
            .register(Some(""), &meta_with_message_id("m1"))
            .await;

        assert_eq!(id.as_deref(), Some("m1"));
        assert_eq!(registry.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn message_id_becomes_the_category_id() {
        let registry = Arc::new(InMemoryCategoryRegistry::new());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        let id = registrar.register(None, &meta_with_message_id("m1")).await;

        assert_eq!(id.as_deref(), Some("m1"));
        let all = registry.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "m1");
        assert_eq!(all[0].actions.len(), 1);
    }

    #[tokio::test]
    async fn no_message_id_means_no_category() {
        let registry = Arc::new(CountingRegistry::default());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        let id = registrar.register(None, &PayloadMeta::default()).await;

        assert!(id.is_none());
        assert_eq!(registry.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn payload_without_buttons_registers_an_empty_category() {
        let registry = Arc::new(InMemoryCategoryRegistry::new());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        let meta = PayloadMeta {
            message_id: Some("m1".into()),
            ..Default::default()
        };
        let id = registrar.register(None, &meta).await;

        assert_eq!(id.as_deref(), Some("m1"));
        let all = registry.get_all().await.unwrap();
        assert!(all[0].actions.is_empty());
    }

    #[tokio::test]
    async fn merge_preserves_existing_categories() {
        let registry = Arc::new(InMemoryCategoryRegistry::new());
        registry
            .set_all(vec![Category {
                id: "older".into(),
                actions: Vec::new(),
            }])
            .await
            .unwrap();

        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);
        registrar.register(None, &meta_with_message_id("m1")).await;

        let mut ids: Vec<String> = registry
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["m1".to_owned(), "older".to_owned()]);
    }

    #[tokio::test]
    async fn merge_overwrites_same_message_id() {
        let registry = Arc::new(InMemoryCategoryRegistry::new());
        let registrar = CategoryRegistrar::new(Arc::clone(&registry) as Arc<dyn CategoryRegistry>);

        registrar.register(None, &meta_with_message_id("m1")).await;
        let meta = PayloadMeta {
            message_id: Some("m1".into()),
            ..Default::default()
        };
        registrar.register(None, &meta).await;

        let all = registry.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].actions.is_empty(), "latest registration wins");
    }

    #[tokio::test]
    async fn registry_failure_degrades_to_no_category() {
        let registrar = CategoryRegistrar::new(Arc::new(BrokenRegistry));
        let id = registrar.register(None, &meta_with_message_id("m1")).await;
        assert!(id.is_none());
    }
}
