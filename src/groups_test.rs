use chrono::NaiveDate;

use crate::error::StorageError;
use crate::groups::Group;
use crate::persons::Person;
use crate::testing;

#[test]
fn test_membership_is_idempotent() {
    let (store, _temp_dir) = testing::store();
    let person = Person {
        id: 0,
        stage_name: "Nayeon".to_string(),
        real_name: "Im Na-yeon".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1995, 9, 22).unwrap(),
        death_date: None,
    };
    let group = Group { id: 0, name: "Twice".to_string(), start_date: NaiveDate::from_ymd_opt(2015, 10, 20).unwrap(), end_date: None };
    let person_id = store.insert_person(&person).unwrap().id();
    let group_id = store.insert_group(&group).unwrap().id();

    assert!(!store.is_membership(person_id, group_id).unwrap());
    assert!(store.insert_membership(person_id, group_id).unwrap());
    assert!(!store.insert_membership(person_id, group_id).unwrap());
    assert!(store.is_membership(person_id, group_id).unwrap());
    assert_eq!(store.members_of(group_id).unwrap().len(), 1);
}

#[test]
fn test_membership_requires_existing_rows() {
    let (store, _temp_dir) = testing::seeded_store();
    let err = store.insert_membership(1, 99).unwrap_err();
    assert!(matches!(err, StorageError::IntegrityViolation(_)), "{:?}", err);
    let err = store.insert_membership(99, 1).unwrap_err();
    assert!(matches!(err, StorageError::IntegrityViolation(_)), "{:?}", err);
}

#[test]
fn test_members_and_groups_of() {
    let (store, _temp_dir) = testing::seeded_store();
    let members: Vec<String> = store.members_of(1).unwrap().into_iter().map(|p| p.stage_name).collect();
    assert_eq!(members, vec!["Jennie", "Lisa"]);

    let groups = store.groups_of(2).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "BLACKPINK");
    assert_eq!(groups[0].end_date, None);

    assert!(store.members_of(99).unwrap().is_empty());
}

#[test]
fn test_person_and_group_dedup() {
    let (store, _temp_dir) = testing::seeded_store();
    let lisa = store.get_person_by_stage_name("Lisa").unwrap().unwrap();
    assert_eq!(lisa.birth_date, NaiveDate::from_ymd_opt(1997, 3, 27).unwrap());
    assert!(!store.insert_person(&lisa).unwrap().is_new());

    let bp = store.get_group_by_name("BLACKPINK").unwrap().unwrap();
    assert!(!store.insert_group(&bp).unwrap().is_new());
    assert_eq!(store.list_persons().unwrap().len(), 2);
    assert_eq!(store.list_groups().unwrap().len(), 1);
}

#[test]
fn test_update_group_end_date() {
    let (store, _temp_dir) = testing::seeded_store();
    let mut bp = store.get_group(1).unwrap().unwrap();
    bp.end_date = NaiveDate::from_ymd_opt(2026, 1, 1);
    assert!(store.update_group(&bp).unwrap());
    assert_eq!(store.get_group(1).unwrap(), Some(bp));
}
