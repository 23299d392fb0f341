//! The claim model: artifact format, compiled pipeline and the shared handle.

pub mod handle;
pub mod pipeline;

pub use handle::*;

#[cfg(test)]
pub(crate) mod fixtures {
    //! A small pipeline over the nine form fields plus two columns the form
    //! never supplies (`region_code`, `airbags`), in a deliberately mixed order.

    use super::ModelHandle;

    pub const MODEL_JSON: &str = r#"{
        "name": "fixture-claims",
        "steps": {
            "prep": {
                "feature_names_in": [
                    "area_cluster", "policy_tenure", "region_code", "age_of_car", "segment",
                    "age_of_policyholder", "fuel_type", "airbags", "population_density",
                    "make", "ncap_rating"
                ],
                "transformers": [
                    {"name": "num", "kind": "standard_scaler",
                     "columns": ["policy_tenure", "age_of_car", "age_of_policyholder", "population_density"],
                     "mean": [1.1, 3.5, 42.0, 18000.0],
                     "scale": [0.8, 2.5, 12.0, 17000.0]},
                    {"name": "cat", "kind": "one_hot",
                     "columns": ["area_cluster", "segment", "fuel_type", "make", "ncap_rating", "region_code"],
                     "categories": [
                        ["A", "B", "C", "D"],
                        ["A", "B", "C"],
                        ["CNG", "Diesel", "Petrol"],
                        ["1", "2", "3"],
                        ["0", "1", "2", "3", "4", "5"],
                        ["R1", "R2"]
                     ]},
                    {"name": "rest", "kind": "passthrough", "columns": ["airbags"]}
                ]
            },
            "clf": {
                "kind": "logistic_regression",
                "coef": [
                    0.30, -0.25, 0.10, -0.05,
                    0.05, 0.10, -0.05, 0.20,
                    0.00, 0.05, -0.05,
                    0.05, -0.05, 0.10,
                    0.00, 0.05, 0.10,
                    0.10, 0.05, 0.00, -0.05, -0.10, -0.15,
                    0.20, -0.20,
                    -0.02
                ],
                "intercept": -2.6
            }
        }
    }"#;

    pub fn handle() -> ModelHandle {
        ModelHandle::from_json_str(MODEL_JSON, None).unwrap()
    }
}
