use std::collections::BTreeSet;

/// One flattened dashboard row, in the column order the sheet expects
/// (columns A through L).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRow {
    pub contact_id: String,
    pub location: String,
    pub full_name: String,
    pub email: String,
    /// `YYYY-MM-DD`, or empty when the contact has no parseable timestamp.
    pub signup_date: String,
    pub tour_member: String,
    pub sale_member: String,
    pub same_day_sale: String,
    pub day_one_booked: String,
    pub sale_tagged: String,
    pub month: String,
    pub year: String,
}

impl SalesRow {
    /// Number of sheet columns a row occupies.
    pub const WIDTH: usize = 12;

    /// Cells in sheet column order.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.contact_id.clone(),
            self.location.clone(),
            self.full_name.clone(),
            self.email.clone(),
            self.signup_date.clone(),
            self.tour_member.clone(),
            self.sale_member.clone(),
            self.same_day_sale.clone(),
            self.day_one_booked.clone(),
            self.sale_tagged.clone(),
            self.month.clone(),
            self.year.clone(),
        ]
    }
}

/// Deduplicated, sorted rosters of the team members named across a run's
/// rows. Logged with the run summary so dropdown drift on the dashboard is
/// easy to spot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamMembers {
    pub sale: Vec<String>,
    pub tour: Vec<String>,
}

impl TeamMembers {
    pub fn from_rows(rows: &[SalesRow]) -> Self {
        let mut sale = BTreeSet::new();
        let mut tour = BTreeSet::new();
        for row in rows {
            if !row.sale_member.is_empty() {
                sale.insert(row.sale_member.clone());
            }
            if !row.tour_member.is_empty() {
                tour.insert(row.tour_member.clone());
            }
        }
        Self {
            sale: sale.into_iter().collect(),
            tour: tour.into_iter().collect(),
        }
    }
}
