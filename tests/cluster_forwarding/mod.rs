mod two_member_case1;
