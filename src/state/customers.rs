use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rust_decimal::Decimal;

use crate::{
    models::{Customer, ModeCategory, Payment, PaymentStatus},
    money::to_decimal128,
    validation::{validate_amount, validate_customer},
};

use super::{
    AppState, companies::require_active_company, transactions::is_referenced_by_transaction,
};

pub async fn list_customers(state: &AppState, company_id: &ObjectId) -> Result<Vec<Customer>> {
    let mut cursor = state
        .customers
        .find(doc! { "company_id": company_id })
        .sort(doc! { "name": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(customer) = cursor.try_next().await? {
        items.push(customer);
    }
    Ok(items)
}

pub async fn get_customer_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Customer>> {
    state
        .customers
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

fn payment_mode(mode: &str) -> Result<String> {
    let mode = mode.trim().to_lowercase();
    if ModeCategory::for_mode(&mode).is_none() {
        bail!("unknown payment mode '{mode}'");
    }
    Ok(mode)
}

async fn ensure_email_free(
    state: &AppState,
    company_id: &ObjectId,
    email: Option<&str>,
    except: Option<&ObjectId>,
) -> Result<()> {
    let Some(email) = email else {
        return Ok(());
    };
    let mut filter = doc! { "company_id": company_id, "email": email };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state.customers.find_one(filter).await?.is_some() {
        bail!("a customer with email '{email}' already exists");
    }
    Ok(())
}

/// Registers a new customer for the company.
pub async fn create_customer(
    state: &AppState,
    company_id: &ObjectId,
    name: &str,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    notes: Option<String>,
) -> Result<ObjectId> {
    let email = normalize_email(email);
    validate_customer(name, email.as_deref())?;
    require_active_company(state, company_id).await?;
    ensure_email_free(state, company_id, email.as_deref(), None).await?;

    let res = state
        .customers
        .insert_one(Customer {
            id: None,
            company_id: *company_id,
            name: name.trim().to_string(),
            email,
            phone,
            address,
            is_active: true,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("customer insert missing _id")
}

pub async fn update_customer(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    is_active: bool,
    notes: Option<String>,
) -> Result<()> {
    let existing = get_customer_by_id(state, id)
        .await?
        .context("customer not found")?;
    let email = normalize_email(email);
    validate_customer(name, email.as_deref())?;
    ensure_email_free(state, &existing.company_id, email.as_deref(), Some(id)).await?;

    state
        .customers
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "email": email,
                "phone": phone,
                "address": address,
                "is_active": is_active,
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

/// Customers with payments or transactions are deactivated instead of removed.
pub async fn delete_customer(state: &AppState, id: &ObjectId) -> Result<()> {
    let has_payments = state
        .payments
        .find_one(doc! { "customer_id": id })
        .await?
        .is_some();

    if has_payments || is_referenced_by_transaction(state, id).await? {
        state
            .customers
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "is_active": false, "updated_at": DateTime::now() } },
            )
            .await?;
        return Ok(());
    }

    state.customers.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

pub async fn list_payments(state: &AppState, customer_id: &ObjectId) -> Result<Vec<Payment>> {
    let mut cursor = state
        .payments
        .find(doc! { "customer_id": customer_id })
        .sort(doc! { "payment_date": -1 })
        .await?;
    let mut items = Vec::new();
    while let Some(payment) = cursor.try_next().await? {
        items.push(payment);
    }
    Ok(items)
}

pub async fn get_payment_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Payment>> {
    state
        .payments
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn create_payment(
    state: &AppState,
    customer_id: &ObjectId,
    amount: Decimal,
    payment_date: DateTime,
    mode: &str,
    reference: Option<String>,
    status: PaymentStatus,
    notes: Option<String>,
) -> Result<ObjectId> {
    validate_amount("amount", amount)?;
    let mode = payment_mode(mode)?;
    let customer = get_customer_by_id(state, customer_id)
        .await?
        .context("customer not found")?;
    if !customer.is_active {
        bail!("customer '{}' is inactive", customer.name);
    }

    let res = state
        .payments
        .insert_one(Payment {
            id: None,
            company_id: customer.company_id,
            customer_id: *customer_id,
            amount: to_decimal128(amount)?,
            payment_date,
            mode,
            reference,
            status,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("payment insert missing _id")
}

pub async fn update_payment(
    state: &AppState,
    id: &ObjectId,
    amount: Decimal,
    payment_date: DateTime,
    mode: &str,
    reference: Option<String>,
    status: PaymentStatus,
    notes: Option<String>,
) -> Result<()> {
    validate_amount("amount", amount)?;
    let mode = payment_mode(mode)?;
    let res = state
        .payments
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "amount": to_decimal128(amount)?,
                "payment_date": payment_date,
                "mode": mode,
                "reference": reference,
                "status": status.as_str(),
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("payment not found");
    }
    Ok(())
}

pub async fn delete_payment(state: &AppState, id: &ObjectId) -> Result<()> {
    if is_referenced_by_transaction(state, id).await? {
        bail!("payment is referenced by transactions; it cannot be deleted");
    }
    state.payments.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
