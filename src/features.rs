//! Form inputs and their encoding into the classifier's feature vector.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 17;

/// Column names in the exact order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Year_of_Study",
    "Attendance",
    "Assignment_Score",
    "Midterm_Score",
    "Final_Score",
    "Tuition_Paid",
    "Outstanding_Balance",
    "Books_Borrowed",
    "Library_Visits",
    "Days_Absent",
    "Gender_Male",
    "Department_Computer Science",
    "Department_Electrical Engineering",
    "Parents_Education_Primary",
    "Parents_Education_University",
    "Chronic_Illness_Yes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Department {
    #[default]
    Other,
    #[serde(rename = "Computer Science")]
    ComputerScience,
    #[serde(rename = "Electrical Engineering")]
    ElectricalEngineering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParentsEducation {
    #[default]
    Other,
    Primary,
    University,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];
}

impl Department {
    pub const ALL: [Department; 3] = [
        Department::Other,
        Department::ComputerScience,
        Department::ElectricalEngineering,
    ];
}

impl ParentsEducation {
    pub const ALL: [ParentsEducation; 3] = [
        ParentsEducation::Other,
        ParentsEducation::Primary,
        ParentsEducation::University,
    ];
}

impl YesNo {
    pub const ALL: [YesNo; 2] = [YesNo::No, YesNo::Yes];
}

/// Raw values as entered on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentInput {
    pub age: i32,
    pub year_of_study: i32,
    pub attendance: i32,
    pub assignment_score: i32,
    pub midterm_score: i32,
    pub final_score: i32,
    pub tuition_paid: i32,
    pub outstanding_balance: i32,
    pub books_borrowed: i32,
    pub library_visits: i32,
    pub days_absent: i32,
    pub gender: Gender,
    pub department: Department,
    pub parents_education: ParentsEducation,
    pub chronic_illness: YesNo,
}

impl Default for StudentInput {
    fn default() -> Self {
        Self {
            age: 20,
            year_of_study: 2,
            attendance: 75,
            assignment_score: 70,
            midterm_score: 65,
            final_score: 60,
            tuition_paid: 80,
            outstanding_balance: 2000,
            books_borrowed: 5,
            library_visits: 10,
            days_absent: 5,
            gender: Gender::Female,
            department: Department::Other,
            parents_education: ParentsEducation::Other,
            chronic_illness: YesNo::No,
        }
    }
}

/// Inclusive slider bounds for each numeric field.
pub const FIELD_BOUNDS: [(&str, i32, i32); 11] = [
    ("age", 15, 30),
    ("year_of_study", 1, 5),
    ("attendance", 0, 100),
    ("assignment_score", 0, 100),
    ("midterm_score", 0, 100),
    ("final_score", 0, 100),
    ("tuition_paid", 0, 100),
    ("outstanding_balance", 0, 10_000),
    ("books_borrowed", 0, 50),
    ("library_visits", 0, 100),
    ("days_absent", 0, 100),
];

impl StudentInput {
    fn numeric_values(&self) -> [i32; 11] {
        [
            self.age,
            self.year_of_study,
            self.attendance,
            self.assignment_score,
            self.midterm_score,
            self.final_score,
            self.tuition_paid,
            self.outstanding_balance,
            self.books_borrowed,
            self.library_visits,
            self.days_absent,
        ]
    }

    /// Checks every numeric field against its slider range.
    pub fn validate(&self) -> Result<(), InputError> {
        for (&(field, min, max), value) in FIELD_BOUNDS.iter().zip(self.numeric_values()) {
            if value < min || value > max {
                return Err(InputError {
                    field,
                    min,
                    max,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Encoded student attributes: 11 measurements plus one-hot indicators.
///
/// This is also the shape persisted with every prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentFeatures {
    pub age: i32,
    pub year_of_study: i32,
    pub attendance: i32,
    pub assignment_score: i32,
    pub midterm_score: i32,
    pub final_score: i32,
    pub tuition_paid: i32,
    pub outstanding_balance: i32,
    pub books_borrowed: i32,
    pub library_visits: i32,
    pub days_absent: i32,
    pub gender_male: bool,
    pub department_cs: bool,
    pub department_ee: bool,
    pub parents_primary: bool,
    pub parents_university: bool,
    pub chronic_illness: bool,
}

impl From<&StudentInput> for StudentFeatures {
    fn from(input: &StudentInput) -> Self {
        Self {
            age: input.age,
            year_of_study: input.year_of_study,
            attendance: input.attendance,
            assignment_score: input.assignment_score,
            midterm_score: input.midterm_score,
            final_score: input.final_score,
            tuition_paid: input.tuition_paid,
            outstanding_balance: input.outstanding_balance,
            books_borrowed: input.books_borrowed,
            library_visits: input.library_visits,
            days_absent: input.days_absent,
            gender_male: input.gender == Gender::Male,
            department_cs: input.department == Department::ComputerScience,
            department_ee: input.department == Department::ElectricalEngineering,
            parents_primary: input.parents_education == ParentsEducation::Primary,
            parents_university: input.parents_education == ParentsEducation::University,
            chronic_illness: input.chronic_illness == YesNo::Yes,
        }
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

impl StudentFeatures {
    /// Feature vector ordered as [`FEATURE_NAMES`].
    pub fn to_vector(&self) -> Array1<f64> {
        Array1::from_vec(vec![
            f64::from(self.age),
            f64::from(self.year_of_study),
            f64::from(self.attendance),
            f64::from(self.assignment_score),
            f64::from(self.midterm_score),
            f64::from(self.final_score),
            f64::from(self.tuition_paid),
            f64::from(self.outstanding_balance),
            f64::from(self.books_borrowed),
            f64::from(self.library_visits),
            f64::from(self.days_absent),
            indicator(self.gender_male),
            indicator(self.department_cs),
            indicator(self.department_ee),
            indicator(self.parents_primary),
            indicator(self.parents_university),
            indicator(self.chronic_illness),
        ])
    }

    /// `(name, value)` pairs for the "User Input Summary" table.
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.to_vector().iter().copied())
            .collect()
    }
}
