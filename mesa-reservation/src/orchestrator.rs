use std::sync::Arc;

use chrono_tz::Tz;
use mesa_catalog::{allocate, occupied_refs, AllocationError, Resource};
use mesa_core::backoffice::{Backoffice, NewBookingLine, NewEvent};
use mesa_core::notify::NotificationSink;
use mesa_core::{Company, CoreError, ReservationPolicy};
use mesa_shared::{Masked, ReservationConfirmedEvent};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::models::{ReservationReceipt, ReservationRequest, ReservedTable};
use crate::ReservationError;

/// Back-office identifiers stamped on created records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EventSettings {
    #[serde(default = "default_event_type")]
    pub event_appointment_type_id: i64,
    #[serde(default = "default_line_type")]
    pub booking_line_appointment_type_id: i64,
}

fn default_event_type() -> i64 { 1 }
fn default_line_type() -> i64 { 2 }

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            event_appointment_type_id: default_event_type(),
            booking_line_appointment_type_id: default_line_type(),
        }
    }
}

/// Turns a reservation request into an event plus booking lines, then notifies the guest.
pub struct ReservationOrchestrator {
    policy: ReservationPolicy,
    settings: EventSettings,
    notifier: Arc<dyn NotificationSink>,
}

impl ReservationOrchestrator {
    pub fn new(
        policy: ReservationPolicy,
        settings: EventSettings,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { policy, settings, notifier }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    pub async fn create(
        &self,
        company: &Company,
        backoffice: &dyn Backoffice,
        tz: Tz,
        request: &ReservationRequest,
    ) -> Result<ReservationReceipt, ReservationError> {
        let start = ReservationPolicy::local_start(request.date, request.time, tz)?;
        let window = self.policy.reservation_window(&start, request.party_size);
        let stop = window.end.with_timezone(&tz);

        // 1. Candidate tables
        let mut tables = backoffice
            .list_resources()
            .await
            .map_err(ReservationError::Backoffice)?;

        if self.policy.allocate_free_tables_only {
            let query = self.policy.occupancy_query(&start, &window)?;
            let occupancy = backoffice
                .list_occupancy(query)
                .await
                .map_err(ReservationError::Backoffice)?;
            let occupied = occupied_refs(&occupancy, &window);
            tables.retain(|t| t.external_ref.map_or(true, |r| !occupied.contains(&r)));
        }

        // 2. Pick tables
        let allocation = match allocate(&tables, request.party_size) {
            Ok(allocation) => allocation,
            Err(err) => return Err(self.allocation_failed(company, &tables, request, err)),
        };

        info!(
            company_id = company.id,
            strategy = ?allocation.strategy,
            tables = ?allocation.resource_ids(),
            "Tables allocated"
        );

        let mut reserved: Vec<ReservedTable> = allocation
            .lines
            .iter()
            .map(|line| ReservedTable::from_line(line, start, stop))
            .collect();

        // 3. Event
        let event = NewEvent {
            title: format!("Reserva {}", request.full_name),
            start: window.start,
            stop: window.end,
            appointment_type_id: self.settings.event_appointment_type_id,
            appointment_status: company.appointment_status.clone(),
            notes: event_notes(&request.phone_number, request.party_size, reserved.len()),
        };

        let event_id = backoffice
            .create_event(&event)
            .await
            .map_err(|source| ReservationError::EventCreation { source })?;

        // 4. One booking line per table
        for index in 0..reserved.len() {
            let line = NewBookingLine {
                resource_id: reserved[index].table_id,
                appointment_type_id: self.settings.booking_line_appointment_type_id,
                reserved_capacity: reserved[index].reserved_capacity,
                event_id,
            };

            match backoffice.create_booking_line(&line).await {
                Ok(booking_id) => reserved[index].booking_id = Some(booking_id),
                Err(source) => {
                    error!(
                        company_id = company.id,
                        event_id = event_id.0,
                        committed = index,
                        total = reserved.len(),
                        "Booking line creation failed, reservation left partial: {}",
                        source
                    );
                    return Err(ReservationError::BookingLines {
                        event_id,
                        tables: reserved,
                        source,
                    });
                }
            }
        }

        // 5. Confirmation (best effort)
        let confirmation = ReservationConfirmedEvent {
            full_name: request.full_name.clone(),
            phone_number: request.phone_number.clone(),
            date: request.date,
            time: request.time,
            capacity: request.party_size,
        };

        if let Err(e) = self.notifier.reservation_confirmed(company, &confirmation).await {
            warn!(company_id = company.id, error = %e, "Reservation confirmation send failed");
        }

        info!(company_id = company.id, event_id = event_id.0, "Reservation created");

        Ok(ReservationReceipt {
            event_id,
            strategy: allocation.strategy,
            tables: reserved,
        })
    }

    fn allocation_failed(
        &self,
        company: &Company,
        tables: &[Resource],
        request: &ReservationRequest,
        err: AllocationError,
    ) -> ReservationError {
        match err {
            AllocationError::CapacityShortfall { requested, reachable, attempted } => {
                info!(
                    company_id = company.id,
                    requested,
                    reachable,
                    attempted = ?attempted,
                    "No table combination seats the party"
                );
                ReservationError::NoAvailableTables { requested, attempted }
            }
            e @ AllocationError::EmptyParty => {
                ReservationError::Schedule(CoreError::ValidationError(e.to_string()))
            }
            e @ AllocationError::InvariantViolation { .. } => {
                error!(
                    company_id = company.id,
                    party_size = request.party_size,
                    date = %request.date,
                    time = %request.time,
                    tables = ?tables,
                    phone = ?Masked(&request.phone_number),
                    "{}",
                    e
                );
                ReservationError::AllocationInvariant(e.to_string())
            }
        }
    }
}

fn event_notes(phone_number: &str, party_size: u32, table_count: usize) -> String {
    let mut notes = format!("Teléfono {}", phone_number);
    if table_count > 1 {
        notes.push_str(&format!("\n\nEs parte de una reserva de {} personas", party_size));
    }
    notes
}
