/// Options for the complex search endpoint.
///
/// Every option is optional except the result count. Empty strings and
/// empty lists are treated as unset and never transmitted.
///
/// # Example
/// ```
/// use forkly::api::SearchCriteria;
///
/// let criteria = SearchCriteria::query("pasta")
///     .cuisine("Italian")
///     .max_ready_time(30)
///     .number(20);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub cuisine: Option<String>,
    pub diet: Option<String>,
    pub intolerances: Option<String>,
    pub meal_type: Option<String>,
    pub include_ingredients: Vec<String>,
    pub exclude_ingredients: Vec<String>,
    pub max_ready_time: Option<u32>,
    pub sort: Option<String>,
    pub number: u32,
    pub add_recipe_information: bool,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            query: None,
            cuisine: None,
            diet: None,
            intolerances: None,
            meal_type: None,
            include_ingredients: Vec::new(),
            exclude_ingredients: Vec::new(),
            max_ready_time: None,
            sort: None,
            number: 10,
            add_recipe_information: false,
        }
    }
}

impl SearchCriteria {
    /// Start from a free-text query
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn diet(mut self, diet: impl Into<String>) -> Self {
        self.diet = Some(diet.into());
        self
    }

    pub fn intolerances(mut self, intolerances: impl Into<String>) -> Self {
        self.intolerances = Some(intolerances.into());
        self
    }

    pub fn meal_type(mut self, meal_type: impl Into<String>) -> Self {
        self.meal_type = Some(meal_type.into());
        self
    }

    pub fn include_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_ready_time(mut self, minutes: u32) -> Self {
        self.max_ready_time = Some(minutes);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn with_recipe_information(mut self) -> Self {
        self.add_recipe_information = true;
        self
    }

    /// Trimmed query, `None` when blank
    pub fn trimmed_query(&self) -> Option<&str> {
        non_blank(self.query.as_deref())
    }

    /// True when any option besides the query would narrow the search
    pub fn has_filters(&self) -> bool {
        non_blank(self.cuisine.as_deref()).is_some()
            || non_blank(self.diet.as_deref()).is_some()
            || non_blank(self.intolerances.as_deref()).is_some()
            || non_blank(self.meal_type.as_deref()).is_some()
            || !joined(&self.include_ingredients).is_empty()
            || !joined(&self.exclude_ingredients).is_empty()
            || self.max_ready_time.is_some()
    }

    /// Query parameters for the search endpoint, excluding the API key
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("number", self.number.to_string())];

        let optional = [
            ("query", self.trimmed_query()),
            ("cuisine", non_blank(self.cuisine.as_deref())),
            ("diet", non_blank(self.diet.as_deref())),
            ("intolerances", non_blank(self.intolerances.as_deref())),
            ("type", non_blank(self.meal_type.as_deref())),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                pairs.push((name, value.to_string()));
            }
        }

        for (name, list) in [
            ("includeIngredients", &self.include_ingredients),
            ("excludeIngredients", &self.exclude_ingredients),
        ] {
            let value = joined(list);
            if !value.is_empty() {
                pairs.push((name, value));
            }
        }

        if let Some(minutes) = self.max_ready_time {
            pairs.push(("maxReadyTime", minutes.to_string()));
        }
        if let Some(sort) = non_blank(self.sort.as_deref()) {
            pairs.push(("sort", sort.to_string()));
        }
        if self.add_recipe_information {
            pairs.push(("addRecipeInformation", "true".to_string()));
        }

        pairs
    }
}

/// Parameters for the find-by-ingredients endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientSearch {
    pub ingredients: Vec<String>,
    pub number: u32,
    pub limit_license: bool,
    /// 1 maximizes used ingredients, 2 minimizes missing ones
    pub ranking: u8,
    pub ignore_pantry: bool,
}

impl IngredientSearch {
    pub fn new<I, S>(ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            number: 10,
            limit_license: true,
            ranking: 1,
            ignore_pantry: false,
        }
    }

    /// Parse a comma-separated list such as "carrot, tomato,potato"
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn ranking(mut self, ranking: u8) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn limit_license(mut self, limit_license: bool) -> Self {
        self.limit_license = limit_license;
        self
    }

    pub fn ignore_pantry(mut self, ignore_pantry: bool) -> Self {
        self.ignore_pantry = ignore_pantry;
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ingredients", joined(&self.ingredients)),
            ("number", self.number.to_string()),
            ("limitLicense", self.limit_license.to_string()),
            ("ranking", self.ranking.to_string()),
            ("ignorePantry", self.ignore_pantry.to_string()),
        ]
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn joined(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
