mod common;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tto_core::CoreError;
use tto_ledger::{IncomeDraft, OfficeError, Payee, PaymentStatus};
use uuid::Uuid;

use common::{approved_project, memory_office};

fn april(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

#[test]
fn income_to_payout_walkthrough() {
    let office = memory_office();
    let project_id = approved_project(&office, dec!(100000));

    let income = office
        .create_income(
            project_id,
            IncomeDraft::new(dec!(50000), april(12)).with_vat_rate(dec!(18)),
        )
        .expect("income");
    assert_eq!(income.vat_amount, dec!(7627.12));
    assert_eq!(income.net_amount, dec!(42372.88));
    assert_eq!(income.description, "Installment 1/1");

    let payee = Payee::User(Uuid::new_v4());
    office.allocate(payee, income.net_amount).expect("allocate");
    let instruction = office
        .create_payment_instruction(payee, dec!(10000), Some("first payout"))
        .expect("instruction");
    office.complete_payment(instruction.id).expect("complete");

    let balance = office.balance(&payee).expect("balance");
    assert_eq!(balance.available_amount, dec!(32372.88));
    assert_eq!(balance.reserved_amount, dec!(0));
    assert_eq!(balance.total_payment, dec!(10000));

    let summary = office.project_summary(project_id).expect("summary");
    assert_eq!(summary.incomes_total, dec!(50000));
    assert_eq!(summary.remaining_budget, dec!(50000));
    assert_eq!(summary.commission_due, income.commission_amount);
}

#[test]
fn guard_dry_run_matches_booking() {
    let office = memory_office();
    let project_id = approved_project(&office, dec!(100000));
    office
        .create_income(project_id, IncomeDraft::new(dec!(90000), april(1)))
        .expect("income");

    let dry_run = office.can_accept_income(project_id, dec!(15000), true);
    assert!(matches!(
        dry_run,
        Err(OfficeError::Core(CoreError::BudgetExceeded { .. }))
    ));
    let booked = office.create_income(project_id, IncomeDraft::new(dec!(15000), april(2)));
    assert!(booked.as_ref().err().is_some_and(OfficeError::is_domain));
    assert!(office.can_accept_income(project_id, dec!(10000), true).is_ok());
    assert_eq!(office.incomes(project_id).expect("incomes").len(), 1);
}

#[test]
fn debt_is_paid_down_before_crediting() {
    let office = memory_office();
    let payee = Payee::Personnel(Uuid::new_v4());
    office.record_debt(payee, dec!(300)).expect("debt");

    let balance = office.allocate(payee, dec!(1000)).expect("allocate");
    assert_eq!(balance.debt_amount, dec!(0));
    assert_eq!(balance.available_amount, dec!(700));

    office.record_debt(payee, dec!(50)).expect("debt");
    let balance = office.allocate(payee, dec!(20)).expect("allocate");
    assert_eq!(balance.debt_amount, dec!(30));
    assert_eq!(balance.available_amount, dec!(700));
}

#[test]
fn rejected_instruction_can_be_reopened_or_deleted() {
    let office = memory_office();
    let payee = Payee::User(Uuid::new_v4());
    office.allocate(payee, dec!(400)).expect("allocate");
    let instruction = office
        .create_payment_instruction(payee, dec!(400), None)
        .expect("instruction");

    office.reject_payment(instruction.id).expect("reject");
    let reopened = office.reopen_payment(instruction.id).expect("reopen");
    assert_eq!(reopened.status, PaymentStatus::Pending);
    office.reject_payment(instruction.id).expect("reject again");
    office
        .delete_payment_instruction(instruction.id)
        .expect("delete");

    let balance = office.balance(&payee).expect("balance");
    assert_eq!(balance.available_amount, dec!(400));
    assert_eq!(balance.reserved_amount, dec!(0));
    assert!(office.payment_instructions(&payee).expect("list").is_empty());

    let totals = office.balance_totals().expect("totals");
    assert_eq!(totals.available, dec!(400));
    assert_eq!(totals.paid_out, dec!(0));
}

#[test]
fn money_renders_with_configured_locale() {
    let office = memory_office();
    assert_eq!(office.format_money(dec!(1234567.891)), "₺1.234.567,89");
}

#[test]
fn export_contains_every_row() {
    let office = memory_office();
    let project_id = approved_project(&office, dec!(1000));
    office
        .create_income(project_id, IncomeDraft::new(dec!(118), april(3)))
        .expect("income");
    let payee = Payee::User(Uuid::new_v4());
    office.allocate(payee, dec!(50)).expect("allocate");
    office
        .create_payment_instruction(payee, dec!(20), None)
        .expect("instruction");

    let json: serde_json::Value =
        serde_json::from_str(&office.export_json().expect("export")).expect("valid json");
    for table in ["projects", "incomes", "balances", "instructions"] {
        assert_eq!(json[table].as_array().map(Vec::len), Some(1), "{table}");
    }
}
