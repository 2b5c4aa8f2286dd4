//! Table changes compiled in both directions through the public API.

use sqlweave_core::migrations::table::primary_key;
use sqlweave_core::migrations::types::{enum_type, integer, text};
use sqlweave_core::migrations::{
    change_table, change_table_statements, ChangeTable, ChangeTableOptions, ChangeUsing,
    DdlStatement, ForeignKeyAction, ForeignKeyOptions, PostAction, ShapeEntry, TableChanger,
};
use sqlweave_core::raw;

fn build(up: bool, f: impl FnOnce(&mut TableChanger) -> Vec<(String, ShapeEntry)>) -> ChangeTable {
    change_table("table", ChangeTableOptions::default(), up, f).unwrap()
}

fn texts(statements: &[DdlStatement]) -> Vec<&str> {
    statements.iter().map(|s| s.sql.text.as_str()).collect()
}

// =============================================================================
// Add and drop
// =============================================================================

#[test]
fn add_and_drop_of_the_same_column_share_one_alter() {
    let describe = |t: &mut TableChanger| {
        t.add(text().name("name"));
        t.drop(text().name("name"));
        Vec::<(String, ShapeEntry)>::new()
    };

    let expected = ["ALTER TABLE \"table\"\n  ADD COLUMN \"name\" text,\n  DROP COLUMN \"name\""];

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(texts(&up), expected);

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(texts(&down), expected);
}

#[test]
fn keyed_add_is_dropped_on_the_way_down() {
    let describe = |t: &mut TableChanger| vec![(String::from("age"), t.add(integer().not_null()))];

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  ADD COLUMN \"age\" integer NOT NULL"]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(texts(&down), ["ALTER TABLE \"table\"\n  DROP COLUMN \"age\""]);
}

// =============================================================================
// Column changes
// =============================================================================

#[test]
fn foreign_key_option_change_replaces_the_constraint() {
    let describe = |t: &mut TableChanger| {
        let from = integer().foreign_key_with(
            "otherTable",
            "id",
            ForeignKeyOptions::new().on_update(ForeignKeyAction::Cascade),
        );
        let to = integer().foreign_key_with(
            "otherTable",
            "id",
            ForeignKeyOptions::new().on_update(ForeignKeyAction::NoAction),
        );
        vec![(String::from("x"), t.change(from, to))]
    };

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  DROP CONSTRAINT \"table_x_fkey\",\n  ADD CONSTRAINT \"table_x_fkey\" FOREIGN KEY (\"x\") REFERENCES \"otherTable\"(\"id\") ON UPDATE NO ACTION"]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(
        texts(&down),
        ["ALTER TABLE \"table\"\n  DROP CONSTRAINT \"table_x_fkey\",\n  ADD CONSTRAINT \"table_x_fkey\" FOREIGN KEY (\"x\") REFERENCES \"otherTable\"(\"id\") ON UPDATE CASCADE"]
    );
}

#[test]
fn type_change_uses_the_cast_for_each_direction() {
    let describe = |t: &mut TableChanger| {
        vec![(
            String::from("name"),
            t.change_using(
                text(),
                integer(),
                ChangeUsing::new(raw("name::integer"), raw("name::text")),
            ),
        )]
    };

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  ALTER COLUMN \"name\" TYPE integer USING name::integer"]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(
        texts(&down),
        ["ALTER TABLE \"table\"\n  ALTER COLUMN \"name\" TYPE text USING name::text"]
    );
}

#[test]
fn rename_is_reversed_on_the_way_down() {
    let describe = |t: &mut TableChanger| vec![(String::from("login"), t.rename("username"))];

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  RENAME COLUMN \"login\" TO \"username\""]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(
        texts(&down),
        ["ALTER TABLE \"table\"\n  RENAME COLUMN \"username\" TO \"login\""]
    );
}

#[test]
fn rename_next_to_a_change_of_the_new_name_survives_rollback() {
    let describe = |t: &mut TableChanger| {
        vec![
            (String::from("login"), t.rename("username")),
            (String::from("username"), t.non_nullable()),
        ]
    };

    let up = build(true, describe);
    assert_eq!(
        texts(&change_table_statements(&up, false).unwrap()),
        [
            "ALTER TABLE \"table\"\n  RENAME COLUMN \"login\" TO \"username\"",
            "ALTER TABLE \"table\"\n  ALTER COLUMN \"username\" SET NOT NULL",
        ]
    );

    let down = build(false, describe);
    assert_eq!(
        texts(&change_table_statements(&down, false).unwrap()),
        [
            "ALTER TABLE \"table\"\n  ALTER COLUMN \"username\" DROP NOT NULL",
            "ALTER TABLE \"table\"\n  RENAME COLUMN \"username\" TO \"login\"",
        ]
    );
    assert_eq!(down.invert(), up);
}

// =============================================================================
// Primary keys
// =============================================================================

#[test]
fn primary_key_flag_changes_are_consolidated() {
    let describe = |t: &mut TableChanger| {
        vec![
            (
                String::from("a"),
                t.change(integer().primary_key(), integer().primary_key()),
            ),
            (String::from("b"), t.change(integer(), integer().primary_key())),
        ]
    };

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  DROP CONSTRAINT \"table_pkey\",\n  ALTER COLUMN \"b\" SET NOT NULL,\n  ADD CONSTRAINT \"table_pkey\" PRIMARY KEY (\"a\", \"b\")"]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(
        texts(&down),
        ["ALTER TABLE \"table\"\n  DROP CONSTRAINT \"table_pkey\",\n  ALTER COLUMN \"b\" DROP NOT NULL,\n  ADD CONSTRAINT \"table_pkey\" PRIMARY KEY (\"a\")"]
    );
}

#[test]
fn primary_key_is_added_once() {
    let describe = |t: &mut TableChanger| {
        t.add_item(primary_key(["a", "b"]));
        vec![(String::from("a"), t.add(integer().primary_key()))]
    };

    let up = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&up),
        ["ALTER TABLE \"table\"\n  ADD COLUMN \"a\" integer NOT NULL,\n  ADD CONSTRAINT \"table_pkey\" PRIMARY KEY (\"a\", \"b\")"]
    );

    let down = change_table_statements(&build(false, describe), false).unwrap();
    assert_eq!(
        texts(&down),
        ["ALTER TABLE \"table\"\n  DROP CONSTRAINT \"table_pkey\",\n  DROP COLUMN \"a\""]
    );
}

// =============================================================================
// Enums
// =============================================================================

#[test]
fn enum_labels_are_read_before_the_alter() {
    let describe =
        |t: &mut TableChanger| vec![(String::from("mood"), t.add(enum_type("mood", ["sad", "ok"])))];

    let statements = change_table_statements(&build(true, describe), false).unwrap();
    assert_eq!(
        texts(&statements),
        [
            "SELECT unnest(enum_range(NULL::\"mood\"))::text",
            "ALTER TABLE \"table\"\n  ADD COLUMN \"mood\" \"mood\"",
        ]
    );
    assert_eq!(
        statements[0].then,
        Some(PostAction::PopulateEnum(String::from("mood")))
    );
    assert_eq!(statements[1].then, None);
}
