//! Menu dishes and their embedded reviews.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DishId, ReviewId};

/// A dish on the menu.
///
/// Reviews are embedded: the dish is the unit of persistence for any review
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

const fn default_available() -> bool {
    true
}

impl Dish {
    /// Create an available dish with no reviews.
    #[must_use]
    pub fn new(id: impl Into<DishId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            category: String::new(),
            image_url: None,
            available: true,
            reviews: Vec::new(),
        }
    }

    /// Average rating, or `None` when nobody reviewed the dish yet.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)] // review counts are tiny
        let avg = f64::from(sum) / self.reviews.len() as f64;
        Some(avg)
    }

    /// Copy of this dish with `review` placed first.
    #[must_use]
    pub fn with_review_prepended(&self, review: Review) -> Self {
        let mut reviews = Vec::with_capacity(self.reviews.len() + 1);
        reviews.push(review);
        reviews.extend(self.reviews.iter().cloned());
        Self {
            reviews,
            ..self.clone()
        }
    }

    /// Copy of this dish where the review sharing `review.id` is replaced.
    #[must_use]
    pub fn with_review_replaced(&self, review: &Review) -> Self {
        let reviews = self
            .reviews
            .iter()
            .map(|r| if r.id == review.id { review.clone() } else { r.clone() })
            .collect();
        Self {
            reviews,
            ..self.clone()
        }
    }

    /// Copy of this dish without the review `review_id`.
    #[must_use]
    pub fn without_review(&self, review_id: &ReviewId) -> Self {
        let reviews = self
            .reviews
            .iter()
            .filter(|r| &r.id != review_id)
            .cloned()
            .collect();
        Self {
            reviews,
            ..self.clone()
        }
    }
}

/// Sort dishes by identifier, highest first.
pub fn sort_by_id_desc(dishes: &mut [Dish]) {
    dishes.sort_by(|a, b| b.id.cmp(&a.id));
}

/// A customer review of a dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub author: String,
    /// Star rating, 1 to 5.
    pub rating: u8,
    #[serde(alias = "comment")]
    pub text: String,
}

/// A review before it has been assigned an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub author: String,
    pub rating: u8,
    pub text: String,
}

impl NewReview {
    /// Attach an identifier.
    #[must_use]
    pub fn with_id(self, id: ReviewId) -> Review {
        Review {
            id,
            author: self.author,
            rating: self.rating,
            text: self.text,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn review(id: &str, rating: u8) -> Review {
        Review {
            id: ReviewId::new(id),
            author: "Kossi".to_owned(),
            rating,
            text: "Très bon".to_owned(),
        }
    }

    fn dish_with_reviews() -> Dish {
        let mut dish = Dish::new("d1", "Poulet yassa", Decimal::new(4500, 2));
        dish.reviews = vec![review("r1", 4), review("r2", 2)];
        dish
    }

    #[test]
    fn test_prepend_puts_review_first() {
        let dish = dish_with_reviews().with_review_prepended(review("r3", 5));
        let ids: Vec<&str> = dish.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r3", "r1", "r2"]);
    }

    #[test]
    fn test_replace_only_touches_matching_id() {
        let mut updated = review("r2", 5);
        updated.text = "Finalement excellent".to_owned();
        let dish = dish_with_reviews().with_review_replaced(&updated);
        assert_eq!(dish.reviews[0], review("r1", 4));
        assert_eq!(dish.reviews[1], updated);
    }

    #[test]
    fn test_without_review() {
        let dish = dish_with_reviews().without_review(&ReviewId::new("r1"));
        assert_eq!(dish.reviews.len(), 1);
        assert_eq!(dish.reviews[0].id.as_str(), "r2");
    }

    #[test]
    fn test_sort_by_id_desc() {
        let mut dishes = vec![
            Dish::new("d1", "Attiéké", Decimal::ONE),
            Dish::new("d3", "Garba", Decimal::ONE),
            Dish::new("d2", "Kedjenou", Decimal::ONE),
        ];
        sort_by_id_desc(&mut dishes);
        let ids: Vec<&str> = dishes.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["d3", "d2", "d1"]);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(dish_with_reviews().average_rating(), Some(3.0));
        assert_eq!(
            Dish::new("d2", "Alloco", Decimal::ONE).average_rating(),
            None
        );
    }

    #[test]
    fn test_deserialize_remote_row_with_missing_reviews() {
        let json = r#"{"id":"d9","name":"Fufu","price":12.5,"imageUrl":"https://img/fufu.png"}"#;
        let dish: Dish = serde_json::from_str(json).unwrap();
        assert_eq!(dish.id.as_str(), "d9");
        assert_eq!(dish.price, Decimal::new(125, 1));
        assert!(dish.available);
        assert!(dish.reviews.is_empty());
    }

    #[test]
    fn test_review_accepts_comment_alias() {
        let json = r#"{"id":"r1","author":"Ama","rating":5,"comment":"Parfait"}"#;
        let parsed: Review = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text, "Parfait");
    }
}
