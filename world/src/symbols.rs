//! Symbol table built from the texture catalogue.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use slot_reels_core::SymbolId;
use thiserror::Error;

/// Category the texture catalogue stores symbol images under.
pub const SYMBOL_CATEGORY: &str = "symbols";

/// Opaque reference to an image owned by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(String);

impl ImageHandle {
    /// Creates a handle from the key the presentation layer resolves.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key the presentation layer resolves.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }
}

/// Catalogue of textures grouped by category.
pub trait TextureSource {
    /// Lists the images of a category in catalogue order, or `None` when absent.
    fn textures(&self, category: &str) -> Option<Vec<ImageHandle>>;
}

/// Reasons a symbol table cannot be built.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SymbolTableError {
    /// The catalogue has no such category.
    #[error("texture category `{0}` is missing")]
    MissingCategory(String),
    /// The category exists but lists no images.
    #[error("texture category `{0}` is empty")]
    Empty(String),
}

/// Maps symbol identifiers onto images. Identifiers run from 1 to `len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolTable {
    images: Vec<ImageHandle>,
}

impl SymbolTable {
    /// Builds the table from images listed in identifier order.
    pub fn from_images<I>(images: I) -> Result<Self, SymbolTableError>
    where
        I: IntoIterator<Item = ImageHandle>,
    {
        let images: Vec<ImageHandle> = images.into_iter().collect();
        if images.is_empty() {
            return Err(SymbolTableError::Empty(SYMBOL_CATEGORY.to_owned()));
        }
        Ok(Self { images })
    }

    /// Builds the table from the symbol category of a texture catalogue.
    pub fn load(source: &impl TextureSource) -> Result<Self, SymbolTableError> {
        let images = source
            .textures(SYMBOL_CATEGORY)
            .ok_or_else(|| SymbolTableError::MissingCategory(SYMBOL_CATEGORY.to_owned()))?;
        Self::from_images(images)
    }

    /// Image assigned to the symbol, if the identifier is known.
    #[must_use]
    pub fn get(&self, symbol: SymbolId) -> Option<&ImageHandle> {
        let index = usize::try_from(symbol.get()).ok()?.checked_sub(1)?;
        self.images.get(index)
    }

    /// Reports whether the identifier is part of the table.
    #[must_use]
    pub fn contains(&self, symbol: SymbolId) -> bool {
        self.get(symbol).is_some()
    }

    /// Number of symbols in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Reports whether the table is empty. Validated tables never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterates `(identifier, image)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &ImageHandle)> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| (SymbolId::new(index as u32 + 1), image))
    }

    pub(crate) fn random(&self, rng: &mut ChaCha8Rng) -> SymbolId {
        let index = rng.gen_range(0..self.images.len().max(1));
        SymbolId::new(index as u32 + 1)
    }
}
