use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{LaborLine, MaterialLine, ParsedIntent, TaskId, TaskQuoteLine};
use crate::pricing::round_money;
use crate::rates::labor::title_case;
use crate::rates::RateTables;

/// A reportable task line together with the unrounded figures behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedTask {
    pub task: TaskId,
    pub line: TaskQuoteLine,
    pub material_total: Decimal,
    pub labor_cost: Decimal,
    pub labor_hours: Decimal,
}

pub trait TaskPricer: Send + Sync {
    fn price_task(&self, task: &TaskId, intent: &ParsedIntent) -> PricedTask;
}

pub struct TableTaskPricer {
    tables: Arc<RateTables>,
}

impl TableTaskPricer {
    pub fn new(tables: Arc<RateTables>) -> Self {
        Self { tables }
    }
}

impl TaskPricer for TableTaskPricer {
    fn price_task(&self, task: &TaskId, intent: &ParsedIntent) -> PricedTask {
        price_task(&self.tables, task, intent)
    }
}

pub fn price_task(tables: &RateTables, task: &TaskId, intent: &ParsedIntent) -> PricedTask {
    let mut materials = Vec::new();
    let mut material_total = Decimal::ZERO;

    for requirement in tables.requirements(task) {
        let cost_per_unit =
            tables.materials().unit_price(&requirement.category, &requirement.item, intent.quality);
        let quantity = requirement.quantity.resolve(intent.area);
        let info = tables.materials().info(&requirement.category, &requirement.item);

        let cost = cost_per_unit * quantity;
        material_total += cost;

        materials.push(MaterialLine {
            name: info.name.to_string(),
            category: requirement.category.clone(),
            item: requirement.item.clone(),
            quantity: round_money(quantity),
            unit: info.unit.to_string(),
            cost_per_unit,
            total_cost: round_money(cost),
        });
    }

    let (labor, labor_cost, labor_hours) =
        match tables.labor().estimate(task, intent.area, &intent.city) {
            Some(estimate) => (
                LaborLine {
                    task_name: estimate.task_name,
                    estimated_time_hours: round_money(estimate.hours),
                    cost: round_money(estimate.cost),
                },
                estimate.cost,
                estimate.hours,
            ),
            None => (LaborLine::unpriced(task.name()), Decimal::ZERO, Decimal::ZERO),
        };

    debug!(
        event_name = "quote.task.priced",
        task = %task,
        material_count = materials.len(),
        material_total = %material_total,
        labor_cost = %labor_cost,
        "task priced"
    );

    PricedTask {
        task: task.clone(),
        line: TaskQuoteLine {
            group: title_case(task.group()),
            task_name: labor.task_name.clone(),
            materials,
            task_subtotal: round_money(material_total + labor_cost),
            labor,
        },
        material_total,
        labor_cost,
        labor_hours,
    }
}
