use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};

use crate::database::criteria::{provided, Criteria, CriteriaBuilder, Predicate};
use crate::database::manager::{is_foreign_key_violation, DatabaseError};
use crate::database::models::company::Company;
use crate::database::sql::{self, sql_for_partial_update, SqlResult};
use crate::validation::{Validate, ValidationErrors};

const SELECT_JOBS: &str = "SELECT j.id, j.title, j.salary, j.equity, \
     j.company_handle, c.name AS company_name \
     FROM jobs j LEFT JOIN companies c ON c.handle = j.company_handle";

const RETURNING_JOB: &str = "RETURNING id, title, salary, equity, company_handle";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

/// A job row as listed, with its company's display name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub equity: Option<Decimal>,
    pub company_handle: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub equity: Option<Decimal>,
    pub company: Company,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

/// Fields a job may change; id and company are fixed at creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub equity: Option<Decimal>,
}

/// Query-string filters for `GET /jobs`.
///
/// `has_equity` is tri-state: absent leaves equity unfiltered, `true` keeps
/// jobs with positive equity, `false` keeps jobs with exactly zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobFilter {
    pub title: Option<String>,
    pub min_salary: Option<i32>,
    pub has_equity: Option<bool>,
}

impl Criteria for JobFilter {
    fn predicates(&self) -> Result<Vec<Predicate>, DatabaseError> {
        let mut predicates = vec![];
        if let Some(title) = provided(&self.title) {
            predicates.push(Predicate::Contains { column: "j.title", text: title.clone() });
        }
        if let Some(min) = provided(&self.min_salary) {
            predicates.push(Predicate::AtLeast { column: "j.salary", value: json!(min) });
        }
        match self.has_equity {
            Some(true) => predicates.push(Predicate::Literal("j.equity > 0")),
            Some(false) => predicates.push(Predicate::Literal("j.equity = 0")),
            None => {}
        }
        Ok(predicates)
    }
}

fn check_equity(errors: &mut ValidationErrors, equity: &Option<Decimal>) {
    if let Some(equity) = equity {
        errors.check(
            *equity >= Decimal::ZERO && *equity <= Decimal::ONE,
            "equity",
            "must be between 0 and 1",
        );
    }
}

impl Validate for NewJob {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length("title", &self.title, 1, 255);
        errors.length("companyHandle", &self.company_handle, 1, 25);
        if let Some(salary) = self.salary {
            errors.check(salary >= 0, "salary", "must be non-negative");
        }
        check_equity(&mut errors, &self.equity);
        errors.into_result()
    }
}

impl Validate for JobUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.length("title", title, 1, 255);
        }
        if let Some(salary) = self.salary {
            errors.check(salary >= 0, "salary", "must be non-negative");
        }
        check_equity(&mut errors, &self.equity);
        errors.into_result()
    }
}

impl Validate for JobFilter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(min) = self.min_salary {
            errors.check(min >= 0, "minSalary", "must be non-negative");
        }
        errors.into_result()
    }
}

impl Job {
    /// Create a job for an existing company
    pub async fn create(pool: &PgPool, data: &NewJob) -> Result<Job, DatabaseError> {
        let sql = format!(
            "INSERT INTO jobs (title, salary, equity, company_handle) VALUES ($1, $2, $3, $4) {}",
            RETURNING_JOB
        );

        sqlx::query_as::<_, Job>(&sql)
            .bind(&data.title)
            .bind(data.salary)
            .bind(data.equity)
            .bind(&data.company_handle)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DatabaseError::bad_request(format!("No company: {}", data.company_handle))
                } else {
                    e.into()
                }
            })
    }

    /// Jobs matching the filter, ordered by title; an empty filter lists all
    pub async fn find_all(
        pool: &PgPool,
        filter: &JobFilter,
    ) -> Result<Vec<JobListing>, DatabaseError> {
        let sql = CriteriaBuilder::build_for(SELECT_JOBS, "j.title", filter)?;
        sql::fetch_all(pool, &sql).await
    }

    /// A job with its company
    pub async fn get(pool: &PgPool, id: i32) -> Result<JobDetail, DatabaseError> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT id, title, salary, equity, company_handle FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found(format!("No job: {}", id)))?;

        let company = sqlx::query_as::<_, Company>(
            "SELECT handle, name, description, num_employees, logo_url FROM companies WHERE handle = $1",
        )
        .bind(&job.company_handle)
        .fetch_one(pool)
        .await?;

        Ok(JobDetail {
            id: job.id,
            title: job.title,
            salary: job.salary,
            equity: job.equity,
            company,
        })
    }

    /// Apply the supplied fields; at least one is required
    pub async fn update(pool: &PgPool, id: i32, data: &JobUpdate) -> Result<Job, DatabaseError> {
        let changes = sql::to_changes(data)?;
        let set = sql_for_partial_update(&changes, &[])?;

        let query = format!(
            "UPDATE jobs SET {} WHERE id = ${} {}",
            set.set_cols,
            set.next_param(),
            RETURNING_JOB
        );
        let mut params = set.values;
        params.push(Value::from(id));

        sql::fetch_optional(pool, &SqlResult { query, params })
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("No job: {}", id)))
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<(), DatabaseError> {
        let deleted = sql::execute(
            pool,
            &SqlResult {
                query: "DELETE FROM jobs WHERE id = $1".to_string(),
                params: vec![json!(id)],
            },
        )
        .await?;

        if deleted == 0 {
            return Err(DatabaseError::not_found(format!("No job: {}", id)));
        }
        Ok(())
    }
}
