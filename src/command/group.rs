use super::{settle, Arg, Args, Arity, Command, CommandError, CommandFactory, Output};
use crate::adapter::{Adapter, Operation};

pub const CATALOG: &[(&str, CommandFactory)] = &[
    (GroupParticipantCount::NAME, GroupParticipantCount::build),
    (GroupParticipants::NAME, GroupParticipants::build),
    (GroupCreate::NAME, GroupCreate::build),
    (GroupJoin::NAME, GroupJoin::build),
    (GroupGetInviteLink::NAME, GroupGetInviteLink::build),
    (GroupExit::NAME, GroupExit::build),
    (GroupRename::NAME, GroupRename::build),
    (GroupSetPicture::NAME, GroupSetPicture::build),
    (GroupOnlyAdminsSendMessages::NAME, GroupOnlyAdminsSendMessages::build),
    (GroupAllUsersSendMessages::NAME, GroupAllUsersSendMessages::build),
    (GroupOnlyAdminsChangeGroupData::NAME, GroupOnlyAdminsChangeGroupData::build),
    (GroupAllUsersChangeGroupData::NAME, GroupAllUsersChangeGroupData::build),
];

/// Commands that take one scalar and call one group method with it.
macro_rules! single_arg_command {
    ($(#[$doc:meta])* $ty:ident, $method:ident, $operation:expr, $output:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $ty {
            arg: String,
        }

        impl $ty {
            pub const NAME: &'static str = stringify!($ty);

            pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
                let args = Args::check(Self::NAME, Arity::exactly(1), args)?;
                Ok(Box::new(Self {
                    arg: args.scalar(0)?,
                }))
            }
        }

        impl Command for $ty {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
                settle(adaptee.group().$method(&self.arg), &[$operation], $output)
            }
        }
    };
}

single_arg_command!(
    /// `GroupParticipantCount||<group>`
    GroupParticipantCount,
    participants_count,
    Operation::GroupParticipantCount,
    Output::Count
);
single_arg_command!(
    /// `GroupParticipants||<group>`
    GroupParticipants,
    get_participants,
    Operation::GroupParticipants,
    Output::List
);
single_arg_command!(
    /// `GroupJoin||<invite link>`
    GroupJoin,
    join_group,
    Operation::JoinGroup,
    Output::Flag
);
single_arg_command!(
    /// `GroupGetInviteLink||<group>`
    GroupGetInviteLink,
    get_invite_link,
    Operation::GetInviteLink,
    Output::Text
);
single_arg_command!(
    /// `GroupExit||<group>`
    GroupExit,
    exit_group,
    Operation::ExitGroup,
    Output::Flag
);
single_arg_command!(
    GroupOnlyAdminsSendMessages,
    only_admins_send_messages,
    Operation::OnlyAdminsSendMessages,
    Output::Flag
);
single_arg_command!(
    GroupAllUsersSendMessages,
    all_users_send_messages,
    Operation::AllUsersSendMessages,
    Output::Flag
);
single_arg_command!(
    GroupOnlyAdminsChangeGroupData,
    only_admins_change_group_data,
    Operation::OnlyAdminsChangeGroupData,
    Output::Flag
);
single_arg_command!(
    GroupAllUsersChangeGroupData,
    all_users_change_group_data,
    Operation::AllUsersChangeGroupData,
    Output::Flag
);

/// `GroupCreate||<group>||[member, member]||<picture>`
///
/// The picture field is passed through verbatim, including the literal
/// `None` some clients send to mean "no picture".
#[derive(Debug)]
pub struct GroupCreate {
    group_name: String,
    members: Vec<String>,
    picture_location: Option<String>,
}

impl GroupCreate {
    pub const NAME: &'static str = "GroupCreate";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::between(2, 3), args)?;
        Ok(Box::new(Self {
            group_name: args.scalar(0)?,
            members: args.list(1)?,
            picture_location: args.optional(2)?,
        }))
    }
}

impl Command for GroupCreate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.group().create_group(
                &self.group_name,
                &self.members,
                self.picture_location.as_deref(),
            ),
            &[Operation::CreateGroup],
            Output::Flag,
        )
    }
}

/// `GroupRename||<old name>||<new name>`
#[derive(Debug)]
pub struct GroupRename {
    old_name: String,
    new_name: String,
}

impl GroupRename {
    pub const NAME: &'static str = "GroupRename";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::exactly(2), args)?;
        Ok(Box::new(Self {
            old_name: args.scalar(0)?,
            new_name: args.scalar(1)?,
        }))
    }
}

impl Command for GroupRename {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.group().rename(&self.old_name, &self.new_name),
            &[Operation::RenameGroup],
            Output::Flag,
        )
    }
}

/// `GroupSetPicture||<group>||<path>`
#[derive(Debug)]
pub struct GroupSetPicture {
    group_name: String,
    picture_location: String,
}

impl GroupSetPicture {
    pub const NAME: &'static str = "GroupSetPicture";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::exactly(2), args)?;
        Ok(Box::new(Self {
            group_name: args.scalar(0)?,
            picture_location: args.scalar(1)?,
        }))
    }
}

impl Command for GroupSetPicture {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee
                .group()
                .set_picture(&self.group_name, &self.picture_location),
            &[Operation::SetGroupPicture],
            Output::Flag,
        )
    }
}
