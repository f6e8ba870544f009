use chrono::{Duration, TimeZone, Utc};
use sqlx::{Connection, SqliteConnection};

use student_performance::database::{NewPrediction, PredictionRecord, PredictionStore};
use student_performance::features::{Department, Gender, ParentsEducation, YesNo};
use student_performance::{PerformanceClass, StudentFeatures, StudentInput};

async fn connection() -> SqliteConnection {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    PredictionStore::new(&mut conn).ensure_schema().await.unwrap();
    conn
}

fn prediction_at(minute: i64, age: i32) -> NewPrediction {
    NewPrediction {
        timestamp: Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap() + Duration::minutes(minute),
        features: StudentFeatures::from(&StudentInput {
            age,
            ..StudentInput::default()
        }),
        prediction: PerformanceClass::High,
        confidence: 0.7,
    }
}

#[tokio::test]
async fn recent_five_of_seven_newest_first() {
    let mut conn = connection().await;
    let mut store = PredictionStore::new(&mut conn);
    for i in 0..7 {
        store.insert(&prediction_at(i, 16 + i as i32)).await.unwrap();
    }

    let recent = store.recent(5).await.unwrap();
    assert_eq!(recent.len(), 5);
    let ages: Vec<i32> = recent.iter().map(|r| r.features.age).collect();
    assert_eq!(ages, vec![22, 21, 20, 19, 18]);
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].timestamp > pair[1].timestamp));
}

#[tokio::test]
async fn clear_then_recent_is_empty() {
    let mut conn = connection().await;
    let mut store = PredictionStore::new(&mut conn);
    for i in 0..4 {
        store.insert(&prediction_at(i, 20)).await.unwrap();
    }
    store.clear().await.unwrap();
    assert!(store.recent(5).await.unwrap().is_empty());

    // The table survives a clear.
    store.insert(&prediction_at(9, 21)).await.unwrap();
    assert_eq!(store.recent(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stored_record_round_trips_every_column() {
    let mut conn = connection().await;
    let mut store = PredictionStore::new(&mut conn);
    let input = StudentInput {
        age: 20,
        year_of_study: 3,
        attendance: 75,
        assignment_score: 81,
        midterm_score: 72,
        final_score: 68,
        tuition_paid: 90,
        outstanding_balance: 1500,
        books_borrowed: 12,
        library_visits: 30,
        days_absent: 4,
        gender: Gender::Male,
        department: Department::ComputerScience,
        parents_education: ParentsEducation::University,
        chronic_illness: YesNo::No,
    };
    let timestamp = Utc.with_ymd_and_hms(2024, 9, 2, 10, 15, 30).unwrap();
    let new = NewPrediction {
        timestamp,
        features: StudentFeatures::from(&input),
        prediction: PerformanceClass::High,
        confidence: 0.82,
    };

    let id = store.insert(&new).await.unwrap();
    let recent = store.recent(1).await.unwrap();

    assert_eq!(
        recent,
        vec![PredictionRecord {
            id,
            timestamp,
            features: new.features.clone(),
            prediction: "High Performance".to_string(),
            confidence: 0.82,
        }]
    );
    let features = &recent[0].features;
    assert_eq!(features.age, 20);
    assert_eq!(features.attendance, 75);
    assert!(features.gender_male && features.department_cs && features.parents_university);
    assert!(!features.department_ee && !features.parents_primary && !features.chronic_illness);
}
