use serde::{Deserialize, Serialize};

use crate::crosstab::{CrossTab, CrossTabReport};
use crate::frequency::{aggregate, FrequencyTable};
use crate::model::{Field, Record};
use crate::summary::{summarize, Summary};

/// Everything the statistics page shows, from a single record set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub summary: Summary,
    pub crops: FrequencyTable,
    pub pests: FrequencyTable,
    pub pesticides: FrequencyTable,
    pub cities: FrequencyTable,
    pub pesticides_per_pest: CrossTabReport,
    pub pests_per_pesticide: CrossTabReport,
    pub pests_per_crop: CrossTabReport,
}

impl Dashboard {
    pub fn build(records: &[Record]) -> Self {
        let pest_pesticide = CrossTab::compute(records, Field::Pests, Field::Pesticides);

        Self {
            summary: summarize(records),
            crops: aggregate(records, Field::Crop),
            pests: aggregate(records, Field::Pests),
            pesticides: aggregate(records, Field::Pesticides),
            cities: aggregate(records, Field::Cities),
            pests_per_pesticide: pest_pesticide.transpose().report(),
            pesticides_per_pest: pest_pesticide.report(),
            pests_per_crop: CrossTab::compute(records, Field::Crop, Field::Pests).report(),
        }
    }
}
