use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::reference::ReferenceData;
use super::ConfigError;
use crate::domain::case::{CaseStatus, Complexity, Priority};
use crate::domain::intake::{Channel, IntakeType, ReporterType};
use crate::domain::investigation::{InvestigationStatus, Outcome};
use crate::domain::taxonomy::Severity;
use crate::sampling::{Distribution, DistributionError, SeedDomain, WeightedValue};

pub const DEFAULT_MASTER_SEED: u64 = 20260202;

/// Everything the generation pipeline reads. Every section falls back to its defaults, so a
/// config file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub master_seed: u64,
    /// Reference "today"; nothing generated is later than the end of this day.
    pub current_date: NaiveDate,
    pub batch_size: usize,
    pub seed_offsets: BTreeMap<SeedDomain, u64>,
    pub volumes: VolumeTargets,
    pub rates: RateConfig,
    pub distributions: DistributionTables,
    pub case_timing: CaseTiming,
    pub temporal: TemporalConfig,
    pub patterns: PatternConfig,
    pub minimums: Minimums,
    pub reference: ReferenceData,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            master_seed: DEFAULT_MASTER_SEED,
            current_date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap_or_default(),
            batch_size: 250,
            seed_offsets: BTreeMap::new(),
            volumes: VolumeTargets::default(),
            rates: RateConfig::default(),
            distributions: DistributionTables::default(),
            case_timing: CaseTiming::default(),
            temporal: TemporalConfig::default(),
            patterns: PatternConfig::default(),
            minimums: Minimums::default(),
            reference: ReferenceData::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeTargets {
    pub intake_records: usize,
    pub employees: usize,
    pub campaigns: usize,
    pub assignments_per_campaign: usize,
    pub saved_views: usize,
    pub ai_conversations: usize,
    pub reports: usize,
}

impl Default for VolumeTargets {
    fn default() -> Self {
        Self {
            intake_records: 5_000,
            employees: 400,
            campaigns: 6,
            assignments_per_campaign: 40,
            saved_views: 20,
            ai_conversations: 60,
            reports: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Cases per intake record; the case target is `round(intake_records * case_ratio)`.
    pub case_ratio: f64,
    /// Share of surplus intake records folded into cases rather than left unlinked.
    pub consolidation_share: f64,
    pub repeat_subject: f64,
    pub hotspot: f64,
    pub regulatory_overlay: f64,
    pub reassignment: f64,
    pub new_case_investigation: f64,
    pub incident_cluster: f64,
    /// Chance an intake record keeps its category's default severity instead of sampling one.
    pub severity_from_category: f64,
    pub workflow: f64,
    pub notification: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            case_ratio: 0.9,
            consolidation_share: 0.5,
            repeat_subject: 0.10,
            hotspot: 0.15,
            regulatory_overlay: 0.10,
            reassignment: 0.10,
            new_case_investigation: 0.5,
            incident_cluster: 0.05,
            severity_from_category: 0.5,
            workflow: 0.5,
            notification: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionTables {
    pub case_status: Vec<WeightedValue<CaseStatus>>,
    pub priority: Vec<WeightedValue<Priority>>,
    pub complexity: Vec<WeightedValue<Complexity>>,
    pub severity: Vec<WeightedValue<Severity>>,
    pub channel: Vec<WeightedValue<Channel>>,
    pub intake_type: Vec<WeightedValue<IntakeType>>,
    pub investigation_open_status: Vec<WeightedValue<InvestigationStatus>>,
    pub outcome: Vec<WeightedValue<Outcome>>,
    /// Split between non-anonymous reporter types once a record is known not to be anonymous.
    pub anonymity: Vec<WeightedValue<ReporterType>>,
}

fn table<T>(entries: &[(T, f64)]) -> Vec<WeightedValue<T>>
where
    T: Copy,
{
    entries.iter().map(|(value, weight)| WeightedValue::new(*value, *weight)).collect()
}

impl Default for DistributionTables {
    fn default() -> Self {
        Self {
            case_status: table(&[
                (CaseStatus::New, 3.0),
                (CaseStatus::Open, 7.0),
                (CaseStatus::Closed, 90.0),
            ]),
            priority: table(&[
                (Priority::Low, 30.0),
                (Priority::Medium, 45.0),
                (Priority::High, 20.0),
                (Priority::Urgent, 5.0),
            ]),
            complexity: table(&[
                (Complexity::Simple, 50.0),
                (Complexity::Medium, 35.0),
                (Complexity::Complex, 15.0),
            ]),
            severity: table(&[
                (Severity::Low, 35.0),
                (Severity::Medium, 40.0),
                (Severity::High, 20.0),
                (Severity::Critical, 5.0),
            ]),
            channel: table(&[
                (Channel::Hotline, 35.0),
                (Channel::WebForm, 35.0),
                (Channel::Email, 15.0),
                (Channel::Chat, 8.0),
                (Channel::InPerson, 5.0),
                (Channel::Mail, 2.0),
            ]),
            intake_type: table(&[
                (IntakeType::Allegation, 55.0),
                (IntakeType::Concern, 25.0),
                (IntakeType::PolicyQuestion, 12.0),
                (IntakeType::Complaint, 8.0),
            ]),
            investigation_open_status: table(&[
                (InvestigationStatus::New, 10.0),
                (InvestigationStatus::Assigned, 25.0),
                (InvestigationStatus::Investigating, 50.0),
                (InvestigationStatus::PendingReview, 15.0),
            ]),
            outcome: table(&[
                (Outcome::Substantiated, 60.0),
                (Outcome::Unsubstantiated, 30.0),
                (Outcome::Inconclusive, 10.0),
            ]),
            anonymity: table(&[(ReporterType::Confidential, 40.0), (ReporterType::Identified, 60.0)]),
        }
    }
}

/// Validated samplers for every configured table.
#[derive(Clone, Debug)]
pub struct CompiledDistributions {
    pub case_status: Distribution<CaseStatus>,
    pub priority: Distribution<Priority>,
    pub complexity: Distribution<Complexity>,
    pub severity: Distribution<Severity>,
    pub channel: Distribution<Channel>,
    pub intake_type: Distribution<IntakeType>,
    pub investigation_open_status: Distribution<InvestigationStatus>,
    pub outcome: Distribution<Outcome>,
    pub anonymity: Distribution<ReporterType>,
}

impl DistributionTables {
    pub fn compile(&self) -> Result<CompiledDistributions, DistributionError> {
        Ok(CompiledDistributions {
            case_status: Distribution::from_table("case_status", &self.case_status)?,
            priority: Distribution::from_table("priority", &self.priority)?,
            complexity: Distribution::from_table("complexity", &self.complexity)?,
            severity: Distribution::from_table("severity", &self.severity)?,
            channel: Distribution::from_table("channel", &self.channel)?,
            intake_type: Distribution::from_table("intake_type", &self.intake_type)?,
            investigation_open_status: Distribution::from_table(
                "investigation_open_status",
                &self.investigation_open_status,
            )?,
            outcome: Distribution::from_table("outcome", &self.outcome)?,
            anonymity: Distribution::from_table("anonymity", &self.anonymity)?,
        })
    }
}

/// Inclusive `[min, max]` span in whole units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub min: i64,
    pub max: i64,
}

impl Span {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn check(&self, name: &str) -> Result<(), ConfigError> {
        if self.min < 0 || self.min > self.max {
            return Err(ConfigError::Validation(format!(
                "{name} must satisfy 0 <= min <= max (got {}..={})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseTiming {
    pub simple_days: Span,
    pub medium_days: Span,
    pub complex_days: Span,
    /// Hours between the primary intake record arriving and the case opening.
    pub intake_lag_hours: Span,
    /// Days since open after which an unresolved case was last touched.
    pub open_activity_days: Span,
}

impl Default for CaseTiming {
    fn default() -> Self {
        Self {
            simple_days: Span::new(2, 4),
            medium_days: Span::new(7, 21),
            complex_days: Span::new(30, 90),
            intake_lag_hours: Span::new(1, 48),
            open_activity_days: Span::new(0, 14),
        }
    }
}

impl CaseTiming {
    pub fn duration_for(&self, complexity: Complexity) -> Span {
        match complexity {
            Complexity::Simple => self.simple_days,
            Complexity::Medium => self.medium_days,
            Complexity::Complex => self.complex_days,
        }
    }
}

/// Window of elevated intake volume, in days before the current date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalSpike {
    pub name: String,
    pub start_days_ago: i64,
    pub end_days_ago: i64,
    pub multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub history_days: i64,
    pub recency_bias: f64,
    pub business_start_hour: u32,
    pub business_end_hour: u32,
    pub weekend_intensity: f64,
    pub rejection_attempts: u32,
    pub seasonal_spikes: Vec<SeasonalSpike>,
    /// Every `boundary_stride`-th record (at `boundary_offset`) lands on a known edge date.
    pub boundary_stride: usize,
    pub boundary_offset: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            history_days: 1_095,
            recency_bias: 0.35,
            business_start_hour: 8,
            business_end_hour: 18,
            weekend_intensity: 0.35,
            rejection_attempts: 12,
            seasonal_spikes: vec![
                SeasonalSpike {
                    name: "post-reorganization".to_string(),
                    start_days_ago: 300,
                    end_days_ago: 240,
                    multiplier: 1.8,
                },
                SeasonalSpike {
                    name: "post-policy-change".to_string(),
                    start_days_ago: 120,
                    end_days_ago: 90,
                    multiplier: 1.5,
                },
            ],
            boundary_stride: 53,
            boundary_offset: 17,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub flagships_enabled: bool,
    pub repeat_subjects: usize,
    pub repeat_subject_quota: u32,
    pub hotspot_managers: usize,
    pub hotspot_quota: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            flagships_enabled: true,
            repeat_subjects: 6,
            repeat_subject_quota: 5,
            hotspot_managers: 4,
            hotspot_quota: 40,
        }
    }
}

/// Smallest committed upstream sets a phase will start from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Minimums {
    pub categories: usize,
    pub locations: usize,
    pub employees: usize,
    pub cases: usize,
}

impl Default for Minimums {
    fn default() -> Self {
        Self { categories: 10, locations: 3, employees: 20, cases: 1 }
    }
}

impl GenerationConfig {
    pub fn case_target(&self) -> usize {
        (self.volumes.intake_records as f64 * self.rates.case_ratio).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let compiled = self.distributions.compile()?;
        if compiled.investigation_open_status.share_of(&InvestigationStatus::Closed) > 0.0 {
            return Err(ConfigError::Validation(
                "distributions.investigation_open_status must not weight CLOSED".to_string(),
            ));
        }
        if compiled.anonymity.share_of(&ReporterType::Anonymous) > 0.0 {
            return Err(ConfigError::Validation(
                "distributions.anonymity splits non-anonymous reporters and must not weight ANONYMOUS"
                    .to_string(),
            ));
        }

        let rates = [
            ("rates.consolidation_share", self.rates.consolidation_share),
            ("rates.repeat_subject", self.rates.repeat_subject),
            ("rates.hotspot", self.rates.hotspot),
            ("rates.regulatory_overlay", self.rates.regulatory_overlay),
            ("rates.reassignment", self.rates.reassignment),
            ("rates.new_case_investigation", self.rates.new_case_investigation),
            ("rates.incident_cluster", self.rates.incident_cluster),
            ("rates.severity_from_category", self.rates.severity_from_category),
            ("rates.workflow", self.rates.workflow),
            ("rates.notification", self.rates.notification),
            ("temporal.recency_bias", self.temporal.recency_bias),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!("{name} must be in range 0..=1")));
            }
        }
        if !(self.rates.case_ratio > 0.0 && self.rates.case_ratio <= 1.0) {
            return Err(ConfigError::Validation("rates.case_ratio must be in range (0, 1]".into()));
        }

        if self.volumes.intake_records == 0 {
            return Err(ConfigError::Validation(
                "volumes.intake_records must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 || self.batch_size > 10_000 {
            return Err(ConfigError::Validation("batch_size must be in range 1..=10000".into()));
        }

        self.case_timing.simple_days.check("case_timing.simple_days")?;
        self.case_timing.medium_days.check("case_timing.medium_days")?;
        self.case_timing.complex_days.check("case_timing.complex_days")?;
        self.case_timing.intake_lag_hours.check("case_timing.intake_lag_hours")?;
        self.case_timing.open_activity_days.check("case_timing.open_activity_days")?;

        self.validate_temporal()?;
        self.validate_seed_offsets()?;
        self.reference.validate()?;

        let minimum_org = self.reference.minimum_org_size();
        if self.volumes.employees < minimum_org.max(self.minimums.employees) {
            return Err(ConfigError::Validation(format!(
                "volumes.employees must be at least {} for the configured departments",
                minimum_org.max(self.minimums.employees)
            )));
        }

        Ok(())
    }

    fn validate_temporal(&self) -> Result<(), ConfigError> {
        let temporal = &self.temporal;
        if temporal.history_days < 30 {
            return Err(ConfigError::Validation(
                "temporal.history_days must be at least 30".to_string(),
            ));
        }
        if temporal.business_start_hour >= temporal.business_end_hour
            || temporal.business_end_hour > 24
        {
            return Err(ConfigError::Validation(
                "temporal business hours must satisfy start < end <= 24".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&temporal.weekend_intensity) || temporal.weekend_intensity == 0.0 {
            return Err(ConfigError::Validation(
                "temporal.weekend_intensity must be in range (0, 1]".to_string(),
            ));
        }
        if temporal.rejection_attempts == 0 {
            return Err(ConfigError::Validation(
                "temporal.rejection_attempts must be greater than zero".to_string(),
            ));
        }
        if temporal.boundary_stride == 0 || temporal.boundary_offset >= temporal.boundary_stride {
            return Err(ConfigError::Validation(
                "temporal.boundary_offset must be below a non-zero boundary_stride".to_string(),
            ));
        }
        for spike in &temporal.seasonal_spikes {
            if spike.start_days_ago < spike.end_days_ago
                || spike.end_days_ago < 0
                || !spike.multiplier.is_finite()
                || spike.multiplier < 1.0
            {
                return Err(ConfigError::Validation(format!(
                    "temporal.seasonal_spikes `{}` must span start_days_ago >= end_days_ago >= 0 with multiplier >= 1",
                    spike.name
                )));
            }
        }
        Ok(())
    }

    fn validate_seed_offsets(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for domain in SeedDomain::ALL {
            let offset =
                self.seed_offsets.get(domain).copied().unwrap_or_else(|| domain.default_offset());
            if !seen.insert(offset) {
                return Err(ConfigError::Validation(format!(
                    "seed_offsets.{domain} reuses offset {offset}; every domain needs its own stream"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GenerationConfig, WeightedValue};
    use crate::config::ConfigError;
    use crate::domain::case::CaseStatus;
    use crate::domain::investigation::InvestigationStatus;
    use crate::sampling::{DistributionError, SeedDomain};

    #[test]
    fn defaults_validate_and_target_ninety_percent() {
        let config = GenerationConfig::default();
        config.validate().expect("defaults are valid");
        assert_eq!(config.case_target(), 4_500);
    }

    #[test]
    fn zero_sum_distribution_fails_validation() {
        let mut config = GenerationConfig::default();
        config.distributions.case_status = vec![
            WeightedValue::new(CaseStatus::Open, 0.0),
            WeightedValue::new(CaseStatus::Closed, 0.0),
        ];
        let error = config.validate().expect_err("zero sum must fail");
        assert!(matches!(
            error,
            ConfigError::Distribution(DistributionError::ZeroSum { ref name }) if name == "case_status"
        ));
    }

    #[test]
    fn open_status_table_cannot_close_investigations() {
        let mut config = GenerationConfig::default();
        config
            .distributions
            .investigation_open_status
            .push(WeightedValue::new(InvestigationStatus::Closed, 1.0));
        let error = config.validate().expect_err("closed weight must fail");
        assert!(error.to_string().contains("investigation_open_status"));
    }

    #[test]
    fn duplicate_seed_offsets_are_rejected() {
        let mut config = GenerationConfig::default();
        config.seed_offsets.insert(SeedDomain::Cases, SeedDomain::Intake.default_offset());
        let error = config.validate().expect_err("shared stream must fail");
        assert!(error.to_string().contains("seed_offsets.cases"));
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: GenerationConfig = toml::from_str(
            r#"
master_seed = 42
current_date = "2025-06-30"

[volumes]
intake_records = 200

[rates]
case_ratio = 0.8
"#,
        )
        .expect("partial config parses");

        assert_eq!(config.master_seed, 42);
        assert_eq!(config.volumes.intake_records, 200);
        assert_eq!(config.volumes.employees, 400);
        assert_eq!(config.case_target(), 160);
        assert_eq!(config.distributions.case_status.len(), 3);
        config.validate().expect("partial config is valid");
    }
}
