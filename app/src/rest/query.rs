#[derive(serde::Serialize, serde::Deserialize)]
pub struct DaysQuery {
    days: Option<i64>,
}

impl DaysQuery {
    pub fn days(&self) -> Option<i64> {
        self.days
    }
}
