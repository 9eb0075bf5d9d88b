use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct RateBody {
    /// 0.00 to 5.00
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: f64,
    #[validate(length(max = 2000))]
    pub review: Option<String>,
}

impl RateBody {
    /// Stored with two decimal places.
    pub fn normalized_rating(&self) -> f64 {
        (self.rating * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rating_bounds() {
        let ok = RateBody {
            rating: 4.5,
            review: None,
        };
        assert!(ok.validate().is_ok());

        let too_high = RateBody {
            rating: 5.01,
            review: None,
        };
        assert!(too_high.validate().is_err());

        let negative = RateBody {
            rating: -0.5,
            review: Some("meh".into()),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn rating_is_rounded_to_cents() {
        let body = RateBody {
            rating: 3.456,
            review: None,
        };
        assert_eq!(body.normalized_rating(), 3.46);
    }
}
