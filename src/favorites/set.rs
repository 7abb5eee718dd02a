use crate::model::{Recipe, RecipeId};

/// Ordered favorites keyed by recipe id: at most one entry per id,
/// insertion order kept for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteSet {
    recipes: Vec<Recipe>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored recipes, keeping the first occurrence of each id
    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let mut set = Self::new();
        for recipe in recipes {
            if !set.contains(recipe.id) {
                set.recipes.push(recipe);
            }
        }
        set
    }

    /// Remove the recipe if present, append it otherwise.
    /// Returns true when the recipe is a favorite afterwards.
    pub fn toggle(&mut self, recipe: Recipe) -> bool {
        match self.recipes.iter().position(|r| r.id == recipe.id) {
            Some(index) => {
                self.recipes.remove(index);
                false
            }
            None => {
                self.recipes.push(recipe);
                true
            }
        }
    }

    pub fn contains(&self, id: RecipeId) -> bool {
        self.recipes.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn clear(&mut self) {
        self.recipes.clear();
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn as_slice(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn to_vec(&self) -> Vec<Recipe> {
        self.recipes.clone()
    }
}
