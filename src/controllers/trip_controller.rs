use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::trip_dto::{
    CancelTripRequest, CurrentTripQuery, EndTripRequest, GpsBatchRequest, GpsFixRequest,
    ListTripsQuery, LocateFixRequest, RecordActivityRequest, RecordFuelRequest, StartTripRequest,
};
use crate::dto::ApiResponse;
use crate::models::activity::Activity;
use crate::models::caller::{CallerIdentity, CallerRole};
use crate::models::fuel::FuelRecord;
use crate::models::gps::{GpsFix, LocatedFix};
use crate::models::trip::{Trip, TripDetail, TripFilter};
use crate::services::authorization::ensure_can_view_driver;
use crate::services::TripLifecycle;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct TripController {
    trips: Arc<TripLifecycle>,
}

impl TripController {
    pub fn new(state: &AppState) -> Self {
        Self {
            trips: state.trips.clone(),
        }
    }

    pub async fn start(
        &self,
        caller: &CallerIdentity,
        request: StartTripRequest,
    ) -> Result<ApiResponse<Trip>, AppError> {
        request.validate()?;

        // Un chofer que no indica driver_id inicia el viaje a su nombre
        let default_driver = (caller.role == CallerRole::Driver).then_some(caller.user_id);
        let trip = self.trips.start(caller, request.into_command(default_driver)).await?;

        Ok(ApiResponse::success_with_message(trip, "Viaje iniciado exitosamente"))
    }

    pub async fn list(
        &self,
        caller: &CallerIdentity,
        query: ListTripsQuery,
    ) -> Result<ApiResponse<Vec<Trip>>, AppError> {
        query.validate()?;

        let mut filter = TripFilter::from(query);
        if caller.role == CallerRole::Driver {
            filter.driver_id = Some(caller.user_id);
        }

        Ok(ApiResponse::success(self.trips.list(&filter).await?))
    }

    pub async fn current(
        &self,
        caller: &CallerIdentity,
        query: CurrentTripQuery,
    ) -> Result<ApiResponse<Option<Trip>>, AppError> {
        let driver_id = query.driver_id.unwrap_or(caller.user_id);
        ensure_can_view_driver(caller, driver_id)?;

        Ok(ApiResponse::success(self.trips.current_trip_for(driver_id).await?))
    }

    pub async fn get(&self, caller: &CallerIdentity, trip_id: Uuid) -> Result<ApiResponse<TripDetail>, AppError> {
        self.trips.authorize(caller, trip_id).await?;
        Ok(ApiResponse::success(self.trips.get(trip_id).await?))
    }

    pub async fn record_activity(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: RecordActivityRequest,
    ) -> Result<ApiResponse<Activity>, AppError> {
        request.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        let activity = self.trips.record_activity(trip_id, request.into()).await?;
        Ok(ApiResponse::success_with_message(activity, "Actividad registrada exitosamente"))
    }

    pub async fn list_activities(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
    ) -> Result<ApiResponse<Vec<Activity>>, AppError> {
        self.trips.authorize(caller, trip_id).await?;
        Ok(ApiResponse::success(self.trips.list_activities(trip_id).await?))
    }

    pub async fn ingest_gps(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: GpsFixRequest,
    ) -> Result<ApiResponse<GpsFix>, AppError> {
        request.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        Ok(ApiResponse::success(self.trips.ingest_gps(trip_id, request.into()).await?))
    }

    pub async fn ingest_gps_batch(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: GpsBatchRequest,
    ) -> Result<ApiResponse<Vec<GpsFix>>, AppError> {
        request.validate_all()?;
        self.trips.authorize(caller, trip_id).await?;

        let fixes = request.fixes.into_iter().map(Into::into).collect();
        let stored = self.trips.ingest_gps_batch(trip_id, fixes).await?;
        let message = format!("{} fixes GPS guardados", stored.len());
        Ok(ApiResponse::success_with_message(stored, message))
    }

    pub async fn locate_fix(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: LocateFixRequest,
    ) -> Result<ApiResponse<LocatedFix>, AppError> {
        request.fix.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        let located = self
            .trips
            .locate_fix(trip_id, request.fix.into(), request.registration)
            .await?;
        Ok(ApiResponse::success(located))
    }

    pub async fn gps_track(&self, caller: &CallerIdentity, trip_id: Uuid) -> Result<ApiResponse<Vec<GpsFix>>, AppError> {
        self.trips.authorize(caller, trip_id).await?;
        Ok(ApiResponse::success(self.trips.gps_track(trip_id).await?))
    }

    pub async fn record_fuel(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: RecordFuelRequest,
    ) -> Result<ApiResponse<FuelRecord>, AppError> {
        request.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        let record = self.trips.record_fuel(trip_id, request.into()).await?;
        Ok(ApiResponse::success_with_message(record, "Combustible registrado exitosamente"))
    }

    pub async fn end(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: EndTripRequest,
    ) -> Result<ApiResponse<Trip>, AppError> {
        request.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        let trip = self.trips.end(trip_id, request.into()).await?;
        Ok(ApiResponse::success_with_message(trip, "Viaje completado exitosamente"))
    }

    pub async fn cancel(
        &self,
        caller: &CallerIdentity,
        trip_id: Uuid,
        request: CancelTripRequest,
    ) -> Result<ApiResponse<Trip>, AppError> {
        request.validate()?;
        self.trips.authorize(caller, trip_id).await?;

        let trip = self.trips.cancel(trip_id, request.reason).await?;
        Ok(ApiResponse::success_with_message(trip, "Viaje cancelado exitosamente"))
    }
}
