use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};

use crate::database::criteria::{provided, Criteria, CriteriaBuilder, Predicate};
use crate::database::manager::{is_unique_violation, violated_constraint, DatabaseError};
use crate::database::sql::{self, sql_for_partial_update, ColumnMap, SqlResult};
use crate::validation::{Validate, ValidationErrors};

const SELECT_COMPANIES: &str =
    "SELECT handle, name, description, num_employees, logo_url FROM companies";

/// Unique constraint Postgres names for `companies.name`
const NAME_CONSTRAINT: &str = "companies_name_key";

const RETURNING_COMPANY: &str = "RETURNING handle, name, description, num_employees, logo_url";

/// API field names that differ from their column
const COMPANY_COLUMNS: ColumnMap = &[("numEmployees", "num_employees"), ("logoUrl", "logo_url")];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

/// Job summary listed under its company
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyJob {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub equity: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<CompanyJob>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Fields a company may change; the handle is immutable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_employees: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Query-string filters for `GET /companies`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyFilter {
    pub name: Option<String>,
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
}

impl Criteria for CompanyFilter {
    fn predicates(&self) -> Result<Vec<Predicate>, DatabaseError> {
        let min = provided(&self.min_employees);
        let max = provided(&self.max_employees);

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(DatabaseError::bad_request(
                    "Min employees cannot be greater than max",
                ));
            }
        }

        let mut predicates = vec![];
        if let Some(name) = provided(&self.name) {
            predicates.push(Predicate::Contains { column: "name", text: name.clone() });
        }
        if let Some(min) = min {
            predicates.push(Predicate::AtLeast { column: "num_employees", value: json!(min) });
        }
        if let Some(max) = max {
            predicates.push(Predicate::AtMost { column: "num_employees", value: json!(max) });
        }
        Ok(predicates)
    }
}

fn check_logo_url(errors: &mut ValidationErrors, logo_url: &Option<String>) {
    if let Some(logo_url) = logo_url {
        errors.check(url::Url::parse(logo_url).is_ok(), "logoUrl", "must be a URL");
    }
}

impl Validate for NewCompany {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length("handle", &self.handle, 1, 25);
        errors.check(
            self.handle.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "handle",
            "must contain only lowercase letters, digits and dashes",
        );
        errors.length("name", &self.name, 1, 255);
        if let Some(n) = self.num_employees {
            errors.check(n >= 0, "numEmployees", "must be non-negative");
        }
        check_logo_url(&mut errors, &self.logo_url);
        errors.into_result()
    }
}

impl Validate for CompanyUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.length("name", name, 1, 255);
        }
        if let Some(n) = self.num_employees {
            errors.check(n >= 0, "numEmployees", "must be non-negative");
        }
        check_logo_url(&mut errors, &self.logo_url);
        errors.into_result()
    }
}

impl Validate for CompanyFilter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(n) = self.min_employees {
            errors.check(n >= 0, "minEmployees", "must be non-negative");
        }
        if let Some(n) = self.max_employees {
            errors.check(n >= 0, "maxEmployees", "must be non-negative");
        }
        errors.into_result()
    }
}

impl Company {
    /// Create a company; a handle already in use is a bad request
    pub async fn create(pool: &PgPool, data: &NewCompany) -> Result<Company, DatabaseError> {
        let duplicate = sqlx::query_scalar::<_, String>("SELECT handle FROM companies WHERE handle = $1")
            .bind(&data.handle)
            .fetch_optional(pool)
            .await?;

        if duplicate.is_some() {
            return Err(DatabaseError::bad_request(format!("Duplicate company: {}", data.handle)));
        }

        let sql = format!(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url) \
             VALUES ($1, $2, $3, $4, $5) {}",
            RETURNING_COMPANY
        );

        sqlx::query_as::<_, Company>(&sql)
            .bind(&data.handle)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.num_employees)
            .bind(&data.logo_url)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if !is_unique_violation(&e) {
                    e.into()
                } else if violated_constraint(&e) == Some(NAME_CONSTRAINT) {
                    DatabaseError::bad_request("Company name already in use")
                } else {
                    DatabaseError::bad_request(format!("Duplicate company: {}", data.handle))
                }
            })
    }

    /// Companies matching the filter, ordered by name; an empty filter lists all
    pub async fn find_all(
        pool: &PgPool,
        filter: &CompanyFilter,
    ) -> Result<Vec<Company>, DatabaseError> {
        let sql = CriteriaBuilder::build_for(SELECT_COMPANIES, "name", filter)?;
        sql::fetch_all(pool, &sql).await
    }

    /// A company with its jobs
    pub async fn get(pool: &PgPool, handle: &str) -> Result<CompanyDetail, DatabaseError> {
        let company = sql::fetch_optional::<Company>(
            pool,
            &SqlResult {
                query: format!("{} WHERE handle = $1", SELECT_COMPANIES),
                params: vec![json!(handle)],
            },
        )
        .await?
        .ok_or_else(|| DatabaseError::not_found(format!("No company: {}", handle)))?;

        let jobs = sqlx::query_as::<_, CompanyJob>(
            "SELECT id, title, salary, equity FROM jobs WHERE company_handle = $1 ORDER BY id",
        )
        .bind(handle)
        .fetch_all(pool)
        .await?;

        Ok(CompanyDetail { company, jobs })
    }

    /// Apply the supplied fields; at least one is required
    pub async fn update(
        pool: &PgPool,
        handle: &str,
        data: &CompanyUpdate,
    ) -> Result<Company, DatabaseError> {
        let changes = sql::to_changes(data)?;
        let set = sql_for_partial_update(&changes, COMPANY_COLUMNS)?;

        let query = format!(
            "UPDATE companies SET {} WHERE handle = ${} {}",
            set.set_cols,
            set.next_param(),
            RETURNING_COMPANY
        );
        let mut params = set.values;
        params.push(Value::String(handle.to_string()));

        sql::fetch_optional(pool, &SqlResult { query, params })
            .await
            .map_err(|e| match e {
                DatabaseError::Sqlx(ref err) if is_unique_violation(err) => {
                    DatabaseError::bad_request("Company name already in use")
                }
                other => other,
            })?
            .ok_or_else(|| DatabaseError::not_found(format!("No company: {}", handle)))
    }

    pub async fn remove(pool: &PgPool, handle: &str) -> Result<(), DatabaseError> {
        let deleted = sql::execute(
            pool,
            &SqlResult {
                query: "DELETE FROM companies WHERE handle = $1".to_string(),
                params: vec![json!(handle)],
            },
        )
        .await?;

        if deleted == 0 {
            return Err(DatabaseError::not_found(format!("No company: {}", handle)));
        }
        Ok(())
    }
}
