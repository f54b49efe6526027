//! Fixtures
//!
//! Cart sets described in YAML, loaded from `<base>/carts/<name>.yml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    config::CartConfig,
    context::CartContext,
    fixtures::items::FixtureItem,
    items::CartItem,
};

pub mod items;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Cart creation error
    #[error("Failed to create cart: {0}")]
    Cart(#[from] CartError),
}

/// A cart set as written in YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartFixture {
    /// Cart settings
    pub config: CartConfig,

    /// Context handed to items
    pub context: CartContext,

    /// Items, in the order they are added
    pub items: Vec<FixtureItem>,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    config: CartConfig,
    context: CartContext,
    items: Vec<FixtureItem>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            config: CartConfig::default(),
            context: CartContext::new(),
            items: Vec::new(),
        }
    }

    /// Load a cart set, replacing anything loaded before.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));

        self.load_file(&file_path)
    }

    /// Load a cart set from a YAML document, replacing anything loaded before.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed.
    pub fn load_yaml(&mut self, yaml: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CartFixture = serde_norway::from_str(yaml)?;

        self.config = fixture.config;
        self.context = fixture.context;
        self.items = fixture.items;

        Ok(self)
    }

    fn load_file(&mut self, path: &Path) -> Result<&mut Self, FixtureError> {
        let contents = fs::read_to_string(path)?;

        self.load_yaml(&contents)
    }

    /// Load a cart set from the default base path
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_cart(name)?;

        Ok(fixture)
    }

    /// Cart settings of the loaded set
    pub fn config(&self) -> CartConfig {
        self.config
    }

    /// Context of the loaded set
    pub fn context(&self) -> &CartContext {
        &self.context
    }

    /// Get all items
    pub fn items(&self) -> &[FixtureItem] {
        &self.items
    }

    /// Get an item by id
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not part of the set.
    pub fn item(&self, id: &str) -> Result<&FixtureItem, FixtureError> {
        self.items
            .iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| FixtureError::ItemNotFound(id.to_string()))
    }

    /// Create a cart holding every loaded item at its fixture quantity
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or an item's binding cannot be
    /// resolved.
    pub fn cart(&self) -> Result<Cart, FixtureError> {
        let mut cart = Cart::from_config(self.config, self.context.clone())?;

        cart.set_items(
            self.items
                .iter()
                .map(|item| Box::new(item.clone()) as Box<dyn CartItem>),
        )?;

        Ok(cart)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
