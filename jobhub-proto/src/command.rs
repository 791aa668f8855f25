use crate::ProtoError;
use std::convert::TryFrom;

/// Binary packet command identifiers, numbered exactly as the wire protocol
/// this crate implements expects. `5` is reserved and never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandId {
    CanDo = 1,
    CantDo = 2,
    ResetAbilities = 3,
    PreSleep = 4,
    Noop = 6,
    SubmitJob = 7,
    JobCreated = 8,
    GrabJob = 9,
    NoJob = 10,
    JobAssign = 11,
    WorkStatus = 12,
    WorkComplete = 13,
    WorkFail = 14,
    GetStatus = 15,
    EchoReq = 16,
    EchoRes = 17,
    SubmitJobBg = 18,
    Error = 19,
    StatusRes = 20,
    SubmitJobHigh = 21,
    SetClientId = 22,
    CanDoTimeout = 23,
    AllYours = 24,
    WorkException = 25,
    OptionReq = 26,
    OptionRes = 27,
    WorkData = 28,
    WorkWarning = 29,
    GrabJobUniq = 30,
    JobAssignUniq = 31,
    SubmitJobHighBg = 32,
    SubmitJobLow = 33,
    SubmitJobLowBg = 34,
}

impl CommandId {
    /// Number of leading, plain-token arguments before this command's
    /// opaque tail (the workload, result data or error text, which may
    /// itself contain embedded NULs). `None` means every argument is a
    /// plain token and the body should be fully split on NUL.
    pub fn leading_arg_count(self) -> Option<usize> {
        match self {
            CommandId::SubmitJob
            | CommandId::SubmitJobBg
            | CommandId::SubmitJobHigh
            | CommandId::SubmitJobHighBg
            | CommandId::SubmitJobLow
            | CommandId::SubmitJobLowBg => Some(2), // function, unique id
            CommandId::WorkComplete | CommandId::WorkData | CommandId::WorkWarning => Some(1), // handle
            CommandId::WorkException | CommandId::WorkFail => Some(1), // handle
            CommandId::Error => Some(1), // error code
            _ => None,
        }
    }
}

impl TryFrom<u32> for CommandId {
    type Error = ProtoError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => CommandId::CanDo,
            2 => CommandId::CantDo,
            3 => CommandId::ResetAbilities,
            4 => CommandId::PreSleep,
            6 => CommandId::Noop,
            7 => CommandId::SubmitJob,
            8 => CommandId::JobCreated,
            9 => CommandId::GrabJob,
            10 => CommandId::NoJob,
            11 => CommandId::JobAssign,
            12 => CommandId::WorkStatus,
            13 => CommandId::WorkComplete,
            14 => CommandId::WorkFail,
            15 => CommandId::GetStatus,
            16 => CommandId::EchoReq,
            17 => CommandId::EchoRes,
            18 => CommandId::SubmitJobBg,
            19 => CommandId::Error,
            20 => CommandId::StatusRes,
            21 => CommandId::SubmitJobHigh,
            22 => CommandId::SetClientId,
            23 => CommandId::CanDoTimeout,
            24 => CommandId::AllYours,
            25 => CommandId::WorkException,
            26 => CommandId::OptionReq,
            27 => CommandId::OptionRes,
            28 => CommandId::WorkData,
            29 => CommandId::WorkWarning,
            30 => CommandId::GrabJobUniq,
            31 => CommandId::JobAssignUniq,
            32 => CommandId::SubmitJobHighBg,
            33 => CommandId::SubmitJobLow,
            34 => CommandId::SubmitJobLowBg,
            other => return Err(ProtoError::UnknownCommand(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_id() {
        for id in 1..=34u32 {
            if id == 5 {
                assert!(CommandId::try_from(id).is_err());
                continue;
            }
            let cmd = CommandId::try_from(id).expect("known command id");
            assert_eq!(cmd as u32, id);
        }
    }

    #[test]
    fn rejects_out_of_range_ids() {
        assert_eq!(CommandId::try_from(0), Err(ProtoError::UnknownCommand(0)));
        assert_eq!(
            CommandId::try_from(999),
            Err(ProtoError::UnknownCommand(999))
        );
    }
}
